//! Command line settings and the line based editing shell
use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

use crate::{
    dal::EditSink,
    editor::LogRetention,
    model::Coordinates,
    session::{Command, Session, SessionSettings},
};

#[derive(Parser, Debug)]
#[command(name = "stop_editor", about = "Relocate transit stops and save the corrections")]
pub struct Args {
    /// Postgres holding the stops table
    #[arg(long, env = "DATABASE_URL", required_unless_present = "stops_file")]
    pub database_url: Option<String>,

    /// Work on a JSON stops file instead of the database
    #[arg(long, env = "STOP_EDITOR_STOPS_FILE", requires = "updates_file")]
    pub stops_file: Option<PathBuf>,

    /// Where saved updates go when working on a stops file
    #[arg(long, env = "STOP_EDITOR_UPDATES_FILE")]
    pub updates_file: Option<PathBuf>,

    /// Name recorded with every update
    #[arg(long, env = "STOP_EDITOR_USER")]
    pub user: String,

    /// Timezone of the update timestamps
    #[arg(
        long,
        env = "STOP_EDITOR_TIMEZONE",
        default_value = "America/Denver",
        value_parser = parse_timezone
    )]
    pub timezone: Tz,

    /// Empty the update log after a successful save instead of resending it with the next one
    #[arg(long, env = "STOP_EDITOR_CLEAR_LOG_ON_SAVE")]
    pub clear_log_on_save: bool,

    #[arg(long, env = "STOP_EDITOR_LOG_DIR", default_value = "./logs")]
    pub log_dir: PathBuf,
}

fn parse_timezone(name: &str) -> Result<Tz, String> {
    name.parse::<Tz>().map_err(|e| e.to_string())
}

impl Args {
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            log_retention: if self.clear_log_on_save {
                LogRetention::ClearAfterSave
            } else {
                LogRetention::KeepAfterSave
            },
            timezone: self.timezone,
        }
    }
}

/// One line typed into the shell
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_flag = true)]
struct Line {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
enum ShellCommand {
    /// List the routes
    Routes,
    /// Select a route
    Route { route_id: String },
    /// List the stops of the selected route
    Stops,
    /// Pick a stop of the selected route by id, "ID: 1,234" works too
    Stop {
        #[arg(num_args = 1.., required = true, allow_hyphen_values = true)]
        raw: Vec<String>,
    },
    /// Report your current location
    Location {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },
    /// Show your current location
    Where,
    /// Move the picked stop to your location
    Move,
    /// Delete the last update
    Undo,
    /// Delete an update by row number
    Delete { row: usize },
    /// Show the pending updates
    Log,
    /// Apply and save the updates
    Save,
    /// Leave the shell
    Quit,
}

enum Parsed {
    Command(Command),
    Quit,
}

fn parse_line(line: &str) -> Result<Option<Parsed>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }

    let parsed = match Line::try_parse_from(words)?.command {
        ShellCommand::Routes => Parsed::Command(Command::ListRoutes),
        ShellCommand::Route { route_id } => Parsed::Command(Command::SelectRoute(route_id)),
        ShellCommand::Stops => Parsed::Command(Command::ListStops),
        // the id is normalized by the session, keep the spaces
        ShellCommand::Stop { raw } => Parsed::Command(Command::EnterStopId(raw.join(" "))),
        ShellCommand::Location {
            latitude,
            longitude,
        } => Parsed::Command(Command::UpdateLocation(Coordinates {
            latitude,
            longitude,
        })),
        ShellCommand::Where => Parsed::Command(Command::ShowLocation),
        ShellCommand::Move => Parsed::Command(Command::MoveStopToLocation),
        ShellCommand::Undo => Parsed::Command(Command::DeleteLast),
        ShellCommand::Delete { row } => Parsed::Command(Command::DeleteRow(row)),
        ShellCommand::Log => Parsed::Command(Command::ShowLog),
        ShellCommand::Save => Parsed::Command(Command::Save),
        ShellCommand::Quit => Parsed::Quit,
    };

    Ok(Some(parsed))
}

/// Reads commands from stdin until `quit` or end of input
pub async fn run_shell<S: EditSink>(mut session: Session, sink: &S) -> Result<(), anyhow::Error> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let prompt = format!("[{} @ {}] > ", session.selected_route(), session.location());
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("Couldn't read command")? else {
            break;
        };

        let command = match parse_line(&line) {
            Ok(Some(Parsed::Command(command))) => command,
            Ok(Some(Parsed::Quit)) => break,
            Ok(None) => continue,
            Err(e) => {
                stdout.write_all(e.render().to_string().as_bytes()).await?;
                continue;
            }
        };

        let output = match session.dispatch(command, sink).await {
            Ok(response) => format!("{response}\n"),
            Err(e) if e.is_fatal() => bail!(e),
            Err(e) => {
                error!("{e:?}");
                format!("{e}\n")
            }
        };
        stdout.write_all(output.as_bytes()).await?;
    }

    if !session.log().is_empty() {
        info!("leaving with {} updates in the log", session.log().len());
    }

    Ok(())
}
