use itertools::Itertools;
use sqlx::{Postgres, QueryBuilder, Transaction};
use tracing::{Instrument, info_span};

use crate::model::EditEntry;

/// Appends the entries to the audit table of stop edits
pub async fn insert_stop_updates(
    entries: &[EditEntry],
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), sqlx::Error> {
    let chunks = entries.chunks(1024).collect_vec();
    for entries in chunks {
        let mut query_builder = QueryBuilder::new(
            "INSERT into stop_updates (
                target_table,
                route_id,
                stop_id,
                original_lat,
                new_lat,
                original_lon,
                new_lon,
                edited_by,
                edited_at
            )",
        );

        query_builder.push_values(entries, |mut b, entry| {
            b.push_bind(entry.target_table.as_str())
                .push_bind(&entry.route_id)
                .push_bind(entry.stop_id)
                .push_bind(entry.original_lat)
                .push_bind(entry.new_lat)
                .push_bind(entry.original_lon)
                .push_bind(entry.new_lon)
                .push_bind(&entry.user)
                .push_bind(&entry.timestamp);
        });

        query_builder
            .build()
            .execute(&mut **tx)
            .instrument(info_span!("Inserting stop updates"))
            .await?;
    }

    Ok(())
}
