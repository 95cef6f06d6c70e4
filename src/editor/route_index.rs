//! Groups the stop table by route
use std::collections::BTreeMap;

use itertools::Itertools;

use crate::model::{StopId, StopRecord};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RouteIndexError {
    #[error("there are no stops to index")]
    EmptyInput,
}

/// Stops of every route, one copy per distinct (position, id, name, time).
/// A derived view, rebuild it whenever the stop table changes.
#[derive(Clone, Debug, Default)]
pub struct RouteIndex {
    routes: BTreeMap<String, Vec<StopRecord>>,
}

/// Key a stop is deduplicated on. f64 has no Eq so coordinates are compared bitwise.
type DedupKey<'a> = (u64, u64, StopId, &'a str, Option<&'a str>);

fn dedup_key(stop: &StopRecord) -> DedupKey<'_> {
    (
        stop.latitude.to_bits(),
        stop.longitude.to_bits(),
        stop.stop_id,
        &stop.stop_name,
        stop.scheduled_time.as_deref(),
    )
}

impl RouteIndex {
    pub fn build(stops: &[StopRecord]) -> Result<Self, RouteIndexError> {
        if stops.is_empty() {
            return Err(RouteIndexError::EmptyInput);
        }

        let mut grouped: BTreeMap<String, Vec<&StopRecord>> = BTreeMap::new();
        for stop in stops {
            grouped.entry(stop.route_id.clone()).or_default().push(stop);
        }

        let routes = grouped
            .into_iter()
            .map(|(route_id, route_stops)| {
                let unique = route_stops
                    .into_iter()
                    .unique_by(|s| dedup_key(*s))
                    .cloned()
                    .collect_vec();
                (route_id, unique)
            })
            .collect();

        Ok(RouteIndex { routes })
    }

    /// Route ids in ascending order
    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn stops(&self, route_id: &str) -> Option<&[StopRecord]> {
        self.routes.get(route_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }
}
