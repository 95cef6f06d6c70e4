use anyhow::Context;
use sqlx::{Pool, Postgres};
use tracing::info;

use super::{EditSink, PersistError, StopSource, get_stops, insert_stop_updates, update_stop_positions};
use crate::model::{EditEntry, StopRecord};

#[derive(Clone, Debug)]
pub struct PgStopStore {
    pool: Pool<Postgres>,
}

impl PgStopStore {
    /// Connects and brings the schema up to date
    pub async fn connect(database_url: &str) -> Result<Self, anyhow::Error> {
        let pool = sqlx::PgPool::connect(database_url)
            .await
            .context("Couldn't connect to the database")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Couldn't run migrations")?;

        Ok(PgStopStore { pool })
    }
}

impl StopSource for PgStopStore {
    async fn load_stops(&self) -> Result<Vec<StopRecord>, anyhow::Error> {
        let stops = get_stops(&self.pool).await?;
        info!("loaded {} stops", stops.len());
        Ok(stops)
    }
}

impl EditSink for PgStopStore {
    /// The audit rows and the stop positions are written in one transaction
    async fn persist(&self, entries: &[EditEntry]) -> Result<(), PersistError> {
        let mut tx = self.pool.begin().await?;

        insert_stop_updates(entries, &mut tx).await?;
        update_stop_positions(entries, &mut tx).await?;

        tx.commit().await?;

        Ok(())
    }
}
