use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use super::stop::{Coordinates, StopId, StopRecord};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The table an edit entry targets. Only stop relocations exist so far.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetTable {
    #[default]
    Stops,
}

impl TargetTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetTable::Stops => "stops",
        }
    }
}

/// A proposed relocation of one stop, pending persistence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditEntry {
    pub target_table: TargetTable,
    pub route_id: String,
    pub stop_id: StopId,
    pub original_lat: f64,
    pub new_lat: f64,
    pub original_lon: f64,
    pub new_lon: f64,
    pub user: String,
    pub timestamp: String,
}

impl EditEntry {
    /// Relocation of `stop` to `new_position`, stamped with `now`.
    pub fn relocation<Tz>(
        stop: &StopRecord,
        new_position: Coordinates,
        user: &str,
        now: DateTime<Tz>,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        EditEntry {
            target_table: TargetTable::Stops,
            route_id: stop.route_id.clone(),
            stop_id: stop.stop_id,
            original_lat: stop.latitude,
            new_lat: new_position.latitude,
            original_lon: stop.longitude,
            new_lon: new_position.longitude,
            user: user.to_string(),
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn original_position(&self) -> Coordinates {
        Coordinates {
            latitude: self.original_lat,
            longitude: self.original_lon,
        }
    }

    pub fn new_position(&self) -> Coordinates {
        Coordinates {
            latitude: self.new_lat,
            longitude: self.new_lon,
        }
    }
}
