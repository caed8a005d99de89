use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::config::Config;
use crate::core::state::AppState;
use crate::models::role::Role;
use crate::stores::attendance::AttendanceStore;
use crate::transport::messenger::Messenger;

// Runs once at boot: open (and migrate) the database, then build shared state
pub fn build_state(config: Config, messenger: Arc<dyn Messenger>) -> Result<AppState> {
    let db_path = config.storage.db_path.clone();
    let store = AttendanceStore::open(&db_path)
        .context(format!("Failed to open database at {}", db_path.display()))?;

    info!(db_path = %db_path.display(), "Database ready");

    let state = AppState::new(config, store, messenger);
    report_unregistered_recipients(&state)?;

    Ok(state)
}

/// Warn about configured report recipients who have never registered.
///
/// Officers still receive course reports without a record; admin-cadets are
/// skipped by every scheduled job until they register.
pub fn report_unregistered_recipients(state: &AppState) -> Result<usize> {
    let course = &state.config.course;
    let mut missing = 0;

    for admin_id in Role::admin_cadets(course) {
        if state.store.get_cadet(admin_id)?.is_none() {
            warn!(user_id = admin_id, "Admin-cadet has not registered, scheduled reports will skip them");
            missing += 1;
        }
    }

    for officer_id in Role::officers(course) {
        if state.store.get_cadet(officer_id)?.is_none() {
            info!(user_id = officer_id, "Officer has not registered");
            missing += 1;
        }
    }

    info!(
        admin_cadets = Role::admin_cadets(course).len(),
        officers = course.officer_ids.len(),
        unregistered = missing,
        "Role configuration loaded"
    );

    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::tests::sample_config;
    use crate::core::state::tests::test_state;
    use crate::transport::messenger::testing::RecordingMessenger;
    use tempfile::TempDir;

    #[test]
    fn test_build_state_creates_database() {
        let dir = TempDir::new().unwrap();
        let mut config = sample_config();
        config.storage.db_path = dir.path().join("data").join("rollcall.sqlite3");

        let state = build_state(config, Arc::new(RecordingMessenger::default())).unwrap();
        assert!(dir.path().join("data").join("rollcall.sqlite3").exists());
        assert!(state.store.get_cadet(1).unwrap().is_none());
    }

    #[test]
    fn test_unregistered_recipients_counted() {
        let (state, _) = test_state(&[]);
        // admins 10, 20; officers 1, 99
        assert_eq!(report_unregistered_recipients(&state).unwrap(), 4);

        state.store.upsert_cadet(10, "841/11", "Adminov A. A.", None).unwrap();
        state.store.upsert_cadet(1, "OFFICERS", "Majorov M. M.", None).unwrap();
        assert_eq!(report_unregistered_recipients(&state).unwrap(), 2);
    }
}
