//! Applies the edit log onto the stop table and hands it to persistence
use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::{
    dal::{EditSink, PersistError},
    editor::EditLog,
    model::{StopId, StopRecord},
};

/// What happens to the edit log after it was persisted successfully.
/// A failed save always keeps the log for the retry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogRetention {
    /// Already saved entries are sent again with every following save
    #[default]
    KeepAfterSave,
    ClearAfterSave,
}

/// Moves every stop named in the log to the entry's new position, in log order.
/// Entries for stops missing from `authoritative` are skipped.
///
/// Returns the touched stops once each, in the order they were first touched.
pub fn apply(log: &EditLog, authoritative: &mut HashMap<StopId, StopRecord>) -> Vec<StopRecord> {
    let mut touched = vec![];
    let mut seen = HashSet::new();

    for entry in log {
        let Some(stop) = authoritative.get_mut(&entry.stop_id) else {
            debug!(stop_id = entry.stop_id, "no stop to apply update to, skipping");
            continue;
        };

        stop.move_to(entry.new_position());

        if seen.insert(entry.stop_id) {
            touched.push(entry.stop_id);
        }
    }

    touched
        .into_iter()
        .filter_map(|stop_id| authoritative.get(&stop_id).cloned())
        .collect_vec()
}

/// Same as [`apply`] over a flat stop table, where one stop id can have many rows.
/// Every row with the entry's stop id is moved, whatever route it belongs to.
pub fn apply_to_rows(log: &EditLog, rows: &mut [StopRecord]) -> Vec<StopRecord> {
    let mut touched = vec![];
    let mut seen = HashSet::new();

    for entry in log {
        let mut matched = false;

        for (i, row) in rows.iter_mut().enumerate() {
            if row.stop_id != entry.stop_id {
                continue;
            }

            if row.route_id != entry.route_id {
                warn!(
                    stop_id = entry.stop_id,
                    edited_route = entry.route_id.as_str(),
                    other_route = row.route_id.as_str(),
                    "stop id is shared across routes, the update applies to both"
                );
            }

            row.move_to(entry.new_position());
            matched = true;

            if seen.insert(i) {
                touched.push(i);
            }
        }

        if !matched {
            debug!(stop_id = entry.stop_id, "no stop to apply update to, skipping");
        }
    }

    touched.into_iter().map(|i| rows[i].clone()).collect_vec()
}

/// Persists the whole log. There is no tracking of what was saved before.
#[tracing::instrument(err, skip_all, fields(entries = log.len()))]
pub async fn save<S: EditSink>(
    log: &mut EditLog,
    sink: &S,
    retention: LogRetention,
) -> Result<(), PersistError> {
    sink.persist(log.entries()).await?;

    info!("saved {} updates", log.len());

    if retention == LogRetention::ClearAfterSave {
        log.clear();
    }

    Ok(())
}
