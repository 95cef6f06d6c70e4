use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

pub type StopId = i64;

/// One row of the stop table. A stop id can show up on several routes and
/// several times per route (one row per scheduled pass).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StopRecord {
    pub stop_id: StopId,
    pub stop_name: String,
    pub route_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Interpolated arrival time, free form
    pub scheduled_time: Option<String>,
}

impl StopRecord {
    pub fn position(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub fn move_to(&mut self, position: Coordinates) {
        self.latitude = position.latitude;
        self.longitude = position.longitude;
    }
}

impl fmt::Display for StopRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ID:{} Time:{} at {}",
            self.stop_name,
            self.stop_id,
            self.scheduled_time.as_deref().unwrap_or("unknown"),
            self.position()
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Where the session starts before any live location was reported (Bozeman, MT)
    pub const FALLBACK: Coordinates = Coordinates {
        latitude: 45.6770,
        longitude: -111.0429,
    };
}

impl Default for Coordinates {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}
