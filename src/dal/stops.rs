use anyhow::Error;
use sqlx::{Pool, Postgres, Transaction, query, query_as};
use tracing::{Instrument, info_span};

use crate::model::{EditEntry, StopRecord};

#[tracing::instrument(err, skip(pool))]
pub async fn get_stops(pool: &Pool<Postgres>) -> Result<Vec<StopRecord>, Error> {
    let stops: Vec<StopRecord> = query_as(
        "SELECT
        stop_id,
        stop_name,
        route_id,
        latitude,
        longitude,
        scheduled_time
        from stops order by route_id, scheduled_time",
    )
    .fetch_all(pool)
    .await?;

    Ok(stops)
}

/// Moves every row of each entry's stop, in log order so the last entry for a stop wins
pub async fn update_stop_positions(
    entries: &[EditEntry],
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), sqlx::Error> {
    for entry in entries {
        query(
            "
    UPDATE stops
    SET latitude = $1, longitude = $2
    where stop_id = $3
    ",
        )
        .bind(entry.new_lat)
        .bind(entry.new_lon)
        .bind(entry.stop_id)
        .execute(&mut **tx)
        .instrument(info_span!("Updating stop position", stop_id = entry.stop_id))
        .await?;
    }

    Ok(())
}
