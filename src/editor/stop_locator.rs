//! Resolves user typed stop ids within a route
use crate::{
    model::{StopId, StopRecord},
    utils::strip_all,
};

/// Noise people paste along with an id, e.g. "ID: 1,234" copied from a marker popup.
/// Removed in this order.
const STOP_ID_NOISE: [&str; 5] = [",", " ", "ID:", ":", "D:"];

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum StopLookupError {
    #[error("the entered stop ID {raw:?} is not a valid integer")]
    InvalidId { raw: String },

    #[error("stop ID {stop_id} does not match any stops in the selected route")]
    NotFound { stop_id: StopId },
}

pub fn normalize(raw: &str) -> Result<StopId, StopLookupError> {
    parse_integer(&strip_all(raw, &STOP_ID_NOISE)).ok_or_else(|| StopLookupError::InvalidId {
        raw: raw.to_string(),
    })
}

/// Base 10 integer, surrounding whitespace and `_` digit separators (1_234) allowed
fn parse_integer(digits: &str) -> Option<StopId> {
    let trimmed = digits.trim();
    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);

    if unsigned.starts_with('_') || unsigned.ends_with('_') || unsigned.contains("__") {
        return None;
    }

    trimmed.replace('_', "").parse().ok()
}

pub fn locate(route_stops: &[StopRecord], stop_id: StopId) -> Result<&StopRecord, StopLookupError> {
    route_stops
        .iter()
        .find(|s| s.stop_id == stop_id)
        .ok_or(StopLookupError::NotFound { stop_id })
}
