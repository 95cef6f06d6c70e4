use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{Instrument, info, info_span};

use super::{EditSink, PersistError, StopSource};
use crate::{
    editor::{EditLog, apply_to_rows},
    model::{EditEntry, StopRecord},
};

/// Stops and updates kept in JSON files, for working without a database.
///
/// A save writes the whole log to `updates_path` and rewrites `stops_path`
/// with the updated positions.
#[derive(Clone, Debug)]
pub struct JsonStopStore {
    pub stops_path: PathBuf,
    pub updates_path: PathBuf,
}

impl JsonStopStore {
    pub fn new(stops_path: impl Into<PathBuf>, updates_path: impl Into<PathBuf>) -> Self {
        JsonStopStore {
            stops_path: stops_path.into(),
            updates_path: updates_path.into(),
        }
    }

    async fn read_stops(&self) -> Result<Vec<StopRecord>, anyhow::Error> {
        let stops_string = tokio::fs::read_to_string(&self.stops_path)
            .instrument(info_span!("Reading stops file"))
            .await
            .with_context(|| format!("Couldn't read {}", self.stops_path.display()))?;

        let stops: Vec<StopRecord> = serde_json::from_str(&stops_string)
            .with_context(|| format!("Error parsing stops in {}", self.stops_path.display()))?;

        Ok(stops)
    }
}

/// Writes a sibling `.tmp` file and renames it over `path`, so `path` is never half written
async fn replace_file(path: &Path, contents: String) -> std::io::Result<()> {
    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);

    tokio::fs::write(&tmp_path, contents).await?;
    tokio::fs::rename(&tmp_path, path).await
}

impl StopSource for JsonStopStore {
    async fn load_stops(&self) -> Result<Vec<StopRecord>, anyhow::Error> {
        let stops = self.read_stops().await?;
        info!("loaded {} stops", stops.len());
        Ok(stops)
    }
}

impl EditSink for JsonStopStore {
    async fn persist(&self, entries: &[EditEntry]) -> Result<(), PersistError> {
        let updates = serde_json::to_string_pretty(entries)?;
        replace_file(&self.updates_path, updates)
            .instrument(info_span!("Writing updates file"))
            .await?;

        let mut stops = self.read_stops().await?;
        let log: EditLog = entries.iter().cloned().collect();
        apply_to_rows(&log, &mut stops);

        replace_file(&self.stops_path, serde_json::to_string_pretty(&stops)?)
            .instrument(info_span!("Writing stops file"))
            .await?;

        Ok(())
    }
}
