use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;

use crate::{
    cli::{Args, run_shell},
    dal::{EditSink, JsonStopStore, PgStopStore, StopSource},
    session::{Session, SessionSettings},
    telemetry::init_tracing,
};

mod cli;
mod dal;
mod editor;
mod model;
mod session;
mod telemetry;
mod utils;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    _ = dotenv();
    let args = Args::parse();

    let _telemetry = init_tracing(&args.log_dir)?;
    let settings = args.session_settings();

    match (&args.stops_file, &args.updates_file) {
        (Some(stops_file), Some(updates_file)) => {
            let store = JsonStopStore::new(stops_file, updates_file);
            edit(&store, args.user, settings).await
        }
        (Some(_), None) => anyhow::bail!("--stops-file needs --updates-file"),
        (None, _) => {
            let db_url = args
                .database_url
                .as_deref()
                .context("DATABASE_URL is not set")?;
            let store = PgStopStore::connect(db_url).await?;
            edit(&store, args.user, settings).await
        }
    }
}

async fn edit<S: StopSource + EditSink>(
    store: &S,
    user: String,
    settings: SessionSettings,
) -> Result<()> {
    let stops = store.load_stops().await?;

    let session = Session::start(stops, user, settings)
        .context("Sorry, it looks like the stop data is missing, nothing to edit")?;

    run_shell(session, store).await
}
