// Application state (AppState)

use crate::core::config::Config;
use crate::metrics::collector::Metrics;
use crate::schedule::window::TimeWindows;
use crate::stores::{attendance::AttendanceStore, sessions::RegistrationSessions};
use crate::transport::messenger::Messenger;
use std::sync::Arc;

/// Shared application state
///
/// Built once at startup and handed to the event loop, the scheduler and
/// the HTTP surface. All fields are wrapped in Arc for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Immutable configuration
    pub config: Arc<Config>,

    /// Time-window resolver in the course timezone
    pub windows: Arc<TimeWindows>,

    /// Cadets and check-ins
    pub store: Arc<AttendanceStore>,

    /// Transient registration progress
    pub sessions: Arc<RegistrationSessions>,

    pub metrics: Arc<Metrics>,

    /// Outbound port to the messaging platform
    pub messenger: Arc<dyn Messenger>,
}

impl AppState {
    pub fn new(config: Config, store: AttendanceStore, messenger: Arc<dyn Messenger>) -> Self {
        let windows = Arc::new(TimeWindows::new(config.course.timezone, &config.windows));

        Self {
            config: Arc::new(config),
            windows,
            store: Arc::new(store),
            sessions: Arc::new(RegistrationSessions::new()),
            metrics: Arc::new(Metrics::new()),
            messenger,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::config::tests::sample_config;
    use crate::transport::messenger::testing::RecordingMessenger;

    /// State over an in-memory store plus the recording messenger behind it
    pub(crate) fn test_state(unreachable: &[i64]) -> (AppState, Arc<RecordingMessenger>) {
        let messenger = Arc::new(RecordingMessenger::failing_for(unreachable));
        let store = AttendanceStore::open_in_memory().unwrap();
        let state = AppState::new(sample_config(), store, messenger.clone());
        (state, messenger)
    }
}
