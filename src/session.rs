//! One user's editing session: the stop table, the selection and the pending edits
use std::fmt;

use chrono::Utc;
use chrono_tz::Tz;
use itertools::Itertools;
use tracing::info;

use crate::{
    dal::{EditSink, PersistError},
    editor::{
        EditLog, EditLogError, LogRetention, RouteIndex, RouteIndexError, StopLookupError,
        apply_to_rows, locate, normalize, save,
    },
    model::{Coordinates, EditEntry, StopId, StopRecord},
};

#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub log_retention: LogRetention,
    /// Zone the edit timestamps are written in
    pub timezone: Tz,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            log_retention: LogRetention::default(),
            timezone: chrono_tz::America::Denver,
        }
    }
}

/// Everything a user can ask the session to do
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    ListRoutes,
    SelectRoute(String),
    ListStops,
    EnterStopId(String),
    UpdateLocation(Coordinates),
    ShowLocation,
    MoveStopToLocation,
    DeleteLast,
    DeleteRow(usize),
    ShowLog,
    Save,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    Routes(Vec<String>),
    RouteSelected { route_id: String, stops: usize },
    Stops(Vec<StopRecord>),
    StopSelected(StopRecord),
    Location(Coordinates),
    Moved { stop_name: String, entry: EditEntry },
    DeletedLast(EditEntry),
    DeletedRow { row: usize, entry: EditEntry },
    Log(Vec<EditEntry>),
    Saved { entries: usize, touched: Vec<StopRecord> },
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    RouteIndex(#[from] RouteIndexError),

    #[error(transparent)]
    StopLookup(#[from] StopLookupError),

    #[error(transparent)]
    EditLog(#[from] EditLogError),

    #[error("failed to save, the updates are kept for another try")]
    Persist(#[from] PersistError),

    #[error("route {0:?} doesn't exist")]
    UnknownRoute(String),

    #[error("enter a stop ID first")]
    NoStopSelected,
}

impl SessionError {
    /// Nothing can be shown or edited after these
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::RouteIndex(_))
    }
}

pub struct Session {
    user: String,
    settings: SessionSettings,
    /// Authoritative stop table, positions change on save
    stops: Vec<StopRecord>,
    routes: RouteIndex,
    selected_route: String,
    current_stop: Option<StopId>,
    location: Coordinates,
    log: EditLog,
}

impl Session {
    /// Starts on the first route, at the fallback location, with an empty log
    pub fn start(
        stops: Vec<StopRecord>,
        user: impl Into<String>,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        let routes = RouteIndex::build(&stops)?;
        let selected_route = routes
            .routes()
            .next()
            .ok_or(RouteIndexError::EmptyInput)?
            .to_string();
        let user = user.into();

        info!(user = user.as_str(), routes = routes.len(), stops = stops.len(), "session started");

        Ok(Session {
            user,
            settings,
            stops,
            routes,
            selected_route,
            current_stop: None,
            location: Coordinates::default(),
            log: EditLog::new(),
        })
    }

    pub async fn dispatch<S: EditSink>(
        &mut self,
        command: Command,
        sink: &S,
    ) -> Result<Response, SessionError> {
        match command {
            Command::ListRoutes => Ok(Response::Routes(
                self.routes.routes().map(str::to_string).collect_vec(),
            )),
            Command::SelectRoute(route_id) => self.select_route(route_id),
            Command::ListStops => Ok(Response::Stops(self.route_stops().to_vec())),
            Command::EnterStopId(raw) => self.enter_stop_id(&raw),
            Command::UpdateLocation(location) => {
                self.location = location;
                Ok(Response::Location(location))
            }
            Command::ShowLocation => Ok(Response::Location(self.location)),
            Command::MoveStopToLocation => self.move_stop_to_location(),
            Command::DeleteLast => Ok(Response::DeletedLast(self.log.delete_last()?)),
            Command::DeleteRow(row) => Ok(Response::DeletedRow {
                row,
                entry: self.log.delete_at(row)?,
            }),
            Command::ShowLog => Ok(Response::Log(self.log.entries().to_vec())),
            Command::Save => self.save(sink).await,
        }
    }

    pub fn selected_route(&self) -> &str {
        &self.selected_route
    }

    pub fn current_stop(&self) -> Option<&StopRecord> {
        let stop_id = self.current_stop?;
        locate(self.route_stops(), stop_id).ok()
    }

    pub fn location(&self) -> Coordinates {
        self.location
    }

    pub fn log(&self) -> &EditLog {
        &self.log
    }

    fn route_stops(&self) -> &[StopRecord] {
        self.routes.stops(&self.selected_route).unwrap_or_default()
    }

    fn select_route(&mut self, route_id: String) -> Result<Response, SessionError> {
        let stops = self
            .routes
            .stops(&route_id)
            .ok_or_else(|| SessionError::UnknownRoute(route_id.clone()))?
            .len();

        if route_id != self.selected_route {
            self.current_stop = None;
        }
        self.selected_route = route_id.clone();

        Ok(Response::RouteSelected { route_id, stops })
    }

    /// A failed lookup forgets the previously entered stop
    fn enter_stop_id(&mut self, raw: &str) -> Result<Response, SessionError> {
        self.current_stop = None;

        let stop_id = normalize(raw)?;
        let stop = locate(self.route_stops(), stop_id)?.clone();

        self.current_stop = Some(stop_id);

        Ok(Response::StopSelected(stop))
    }

    fn move_stop_to_location(&mut self) -> Result<Response, SessionError> {
        let stop = self.current_stop().ok_or(SessionError::NoStopSelected)?;
        let now = Utc::now().with_timezone(&self.settings.timezone);
        let entry = EditEntry::relocation(stop, self.location, &self.user, now);
        let stop_name = stop.stop_name.clone();

        info!(
            stop_id = entry.stop_id,
            route_id = entry.route_id.as_str(),
            "stop moved to {}",
            entry.new_position()
        );
        self.log.append(entry.clone());

        Ok(Response::Moved { stop_name, entry })
    }

    /// Applies the log to the stop table, rebuilds the route view and persists the log.
    /// The table keeps the new positions even when persisting fails.
    async fn save<S: EditSink>(&mut self, sink: &S) -> Result<Response, SessionError> {
        let touched = apply_to_rows(&self.log, &mut self.stops);
        self.routes = RouteIndex::build(&self.stops)?;

        let entries = self.log.len();
        save(&mut self.log, sink, self.settings.log_retention).await?;

        Ok(Response::Saved { entries, touched })
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Routes(routes) => write!(f, "{}", routes.iter().join("\n")),
            Response::RouteSelected { route_id, stops } => {
                write!(f, "Route {route_id} selected, {stops} stops")
            }
            Response::Stops(stops) => write!(f, "{}", stops.iter().join("\n")),
            Response::StopSelected(stop) => write!(f, "Accessing: {} stop", stop.stop_name),
            Response::Location(location) => write!(
                f,
                "Live Latitude: {}, Live Longitude: {}",
                location.latitude, location.longitude
            ),
            Response::Moved { stop_name, entry } => write!(
                f,
                "Stop {stop_name} has been moved from {} to {}",
                entry.original_position(),
                entry.new_position()
            ),
            Response::DeletedLast(_) => write!(f, "Last update deleted."),
            Response::DeletedRow { row, .. } => write!(f, "Row {row} deleted."),
            Response::Log(entries) if entries.is_empty() => write!(f, "No updates."),
            Response::Log(entries) => {
                writeln!(
                    f,
                    "row\ttable\troute\tstop_id\tinit_lat\tnew_lat\tinit_lon\tnew_lon\tuser\ttime"
                )?;
                let mut rows = entries.iter().enumerate().map(|(i, e)| {
                    format!(
                        "{i}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                        e.target_table.as_str(),
                        e.route_id,
                        e.stop_id,
                        e.original_lat,
                        e.new_lat,
                        e.original_lon,
                        e.new_lon,
                        e.user,
                        e.timestamp
                    )
                });
                write!(f, "{}", rows.join("\n"))
            }
            Response::Saved { entries, .. } => {
                write!(f, "Saved successfully! ({entries} updates)")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::reconciler::tests::{RecordingSink, stop};

    fn stops() -> Vec<StopRecord> {
        vec![
            stop(1, "Blue", 45.0, -111.0),
            stop(2, "Blue", 45.5, -111.5),
            stop(1, "Blue", 45.0, -111.0),
            stop(3, "Red", 45.7, -111.7),
        ]
    }

    fn session() -> Result<Session, SessionError> {
        Session::start(stops(), "jane", SessionSettings::default())
    }

    const HERE: Coordinates = Coordinates {
        latitude: 46.0,
        longitude: -112.0,
    };

    #[test]
    fn test_start_requires_stops() {
        let err = Session::start(vec![], "jane", SessionSettings::default())
            .err()
            .expect("empty stops rejected");

        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_starts_on_first_route_at_fallback_location() -> Result<(), anyhow::Error> {
        let sink = RecordingSink::default();
        let mut session = session()?;

        assert_eq!(session.selected_route(), "Blue");
        assert_eq!(
            session.dispatch(Command::ShowLocation, &sink).await?,
            Response::Location(Coordinates::FALLBACK)
        );
        assert_eq!(
            session.dispatch(Command::ListRoutes, &sink).await?,
            Response::Routes(vec!["Blue".to_string(), "Red".to_string()])
        );
        // the duplicated row of stop 1 is shown once
        match session.dispatch(Command::ListStops, &sink).await? {
            Response::Stops(stops) => assert_eq!(stops.len(), 2),
            other => panic!("unexpected response {other:?}"),
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_stop_lookup_is_route_scoped() -> Result<(), anyhow::Error> {
        let sink = RecordingSink::default();
        let mut session = session()?;

        let res = session.dispatch(Command::EnterStopId("3".to_string()), &sink).await;
        assert!(matches!(
            res,
            Err(SessionError::StopLookup(StopLookupError::NotFound { stop_id: 3 }))
        ));

        session
            .dispatch(Command::SelectRoute("Red".to_string()), &sink)
            .await?;
        let res = session
            .dispatch(Command::EnterStopId("ID: 3".to_string()), &sink)
            .await?;
        assert_eq!(res.to_string(), "Accessing: Stop 3 stop");
        assert_eq!(session.current_stop().map(|s| s.stop_id), Some(3));

        let res = session
            .dispatch(Command::SelectRoute("Purple".to_string()), &sink)
            .await;
        assert!(matches!(res, Err(SessionError::UnknownRoute(_))));

        Ok(())
    }

    #[tokio::test]
    async fn test_changing_route_forgets_stop() -> Result<(), anyhow::Error> {
        let sink = RecordingSink::default();
        let mut session = session()?;

        session
            .dispatch(Command::EnterStopId("1".to_string()), &sink)
            .await?;
        session
            .dispatch(Command::SelectRoute("Red".to_string()), &sink)
            .await?;

        let res = session.dispatch(Command::MoveStopToLocation, &sink).await;
        assert!(matches!(res, Err(SessionError::NoStopSelected)));

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_stop_id_forgets_previous_stop() -> Result<(), anyhow::Error> {
        let sink = RecordingSink::default();
        let mut session = session()?;

        session
            .dispatch(Command::EnterStopId("1".to_string()), &sink)
            .await?;
        let res = session
            .dispatch(Command::EnterStopId("999".to_string()), &sink)
            .await;
        assert!(matches!(
            res,
            Err(SessionError::StopLookup(StopLookupError::NotFound { stop_id: 999 }))
        ));

        let res = session.dispatch(Command::MoveStopToLocation, &sink).await;
        assert!(matches!(res, Err(SessionError::NoStopSelected)));
        assert!(session.log().is_empty());

        session
            .dispatch(Command::EnterStopId("2".to_string()), &sink)
            .await?;
        session
            .dispatch(Command::EnterStopId("abc".to_string()), &sink)
            .await
            .err()
            .expect("invalid id");
        assert!(session.current_stop().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_id_is_recoverable() -> Result<(), anyhow::Error> {
        let sink = RecordingSink::default();
        let mut session = session()?;

        let err = session
            .dispatch(Command::EnterStopId("abc".to_string()), &sink)
            .await
            .err()
            .expect("invalid id");
        assert!(!err.is_fatal());

        session
            .dispatch(Command::EnterStopId("2".to_string()), &sink)
            .await?;
        assert_eq!(session.current_stop().map(|s| s.stop_id), Some(2));

        Ok(())
    }

    #[tokio::test]
    async fn test_move_then_save() -> Result<(), anyhow::Error> {
        let sink = RecordingSink::default();
        let mut session = session()?;

        session
            .dispatch(Command::EnterStopId("1".to_string()), &sink)
            .await?;
        session
            .dispatch(Command::UpdateLocation(HERE), &sink)
            .await?;
        let moved = session.dispatch(Command::MoveStopToLocation, &sink).await?;
        assert_eq!(
            moved.to_string(),
            "Stop Stop 1 has been moved from 45,-111 to 46,-112"
        );

        let entry = session.log().entries().first().cloned().expect("entry appended");
        assert_eq!(entry.user, "jane");
        assert_eq!(entry.route_id, "Blue");
        assert_eq!(entry.original_position(), Coordinates { latitude: 45.0, longitude: -111.0 });
        assert_eq!(entry.new_position(), HERE);

        match session.dispatch(Command::Save, &sink).await? {
            Response::Saved { entries, touched } => {
                assert_eq!(entries, 1);
                assert_eq!(touched.len(), 2);
            }
            other => panic!("unexpected response {other:?}"),
        }

        assert_eq!(sink.batches(), vec![vec![entry]]);
        assert!(
            session
                .stops
                .iter()
                .filter(|s| s.stop_id == 1)
                .all(|s| s.position() == HERE)
        );
        // route view is rebuilt from the moved stops
        assert_eq!(session.current_stop().map(StopRecord::position), Some(HERE));
        // default retention keeps the log
        assert_eq!(session.log().len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_clear_after_save_setting() -> Result<(), anyhow::Error> {
        let sink = RecordingSink::default();
        let settings = SessionSettings {
            log_retention: LogRetention::ClearAfterSave,
            ..Default::default()
        };
        let mut session = Session::start(stops(), "jane", settings)?;

        session
            .dispatch(Command::EnterStopId("2".to_string()), &sink)
            .await?;
        session.dispatch(Command::MoveStopToLocation, &sink).await?;
        session.dispatch(Command::Save, &sink).await?;

        assert!(session.log().is_empty());
        assert_eq!(sink.batches().len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_save_keeps_entries() -> Result<(), anyhow::Error> {
        let sink = RecordingSink::failing();
        let mut session = session()?;

        session
            .dispatch(Command::EnterStopId("2".to_string()), &sink)
            .await?;
        session
            .dispatch(Command::UpdateLocation(HERE), &sink)
            .await?;
        session.dispatch(Command::MoveStopToLocation, &sink).await?;

        let err = session
            .dispatch(Command::Save, &sink)
            .await
            .err()
            .expect("save fails");
        assert!(matches!(err, SessionError::Persist(_)));
        assert!(!err.is_fatal());
        assert_eq!(session.log().len(), 1);

        Ok(())
    }

    #[test]
    fn test_log_display() {
        let mut entry = crate::editor::reconciler::tests::entry(7, "Blue", 46.0, -112.0);
        entry.user = "jane".to_string();

        assert_eq!(Response::Log(vec![]).to_string(), "No updates.");
        assert_eq!(
            Response::Log(vec![entry]).to_string(),
            "row\ttable\troute\tstop_id\tinit_lat\tnew_lat\tinit_lon\tnew_lon\tuser\ttime\n\
             0\tstops\tBlue\t7\t45\t46\t-111\t-112\tjane\t2024-05-03 14:05:09"
        );
    }

    #[tokio::test]
    async fn test_delete_commands() -> Result<(), anyhow::Error> {
        let sink = RecordingSink::default();
        let mut session = session()?;

        let res = session.dispatch(Command::DeleteLast, &sink).await;
        assert!(matches!(
            res,
            Err(SessionError::EditLog(EditLogError::EmptyLog))
        ));

        for raw in ["1", "2", "1"] {
            session
                .dispatch(Command::EnterStopId(raw.to_string()), &sink)
                .await?;
            session.dispatch(Command::MoveStopToLocation, &sink).await?;
        }

        let res = session.dispatch(Command::DeleteRow(3), &sink).await;
        assert!(matches!(
            res,
            Err(SessionError::EditLog(EditLogError::IndexOutOfRange {
                position: 3,
                len: 3
            }))
        ));

        let res = session.dispatch(Command::DeleteRow(1), &sink).await?;
        assert_eq!(res.to_string(), "Row 1 deleted.");
        let res = session.dispatch(Command::DeleteLast, &sink).await?;
        assert_eq!(res.to_string(), "Last update deleted.");

        match session.dispatch(Command::ShowLog, &sink).await? {
            Response::Log(entries) => {
                assert_eq!(entries.iter().map(|e| e.stop_id).collect_vec(), vec![1])
            }
            other => panic!("unexpected response {other:?}"),
        }

        Ok(())
    }
}
