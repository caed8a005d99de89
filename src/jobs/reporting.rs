// Scheduled notifications and reports, best effort per recipient

use chrono::DateTime;
use chrono_tz::Tz;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::core::config::{JobKind, ScheduleEntry};
use crate::core::error::StoreError;
use crate::core::state::AppState;
use crate::handlers::keyboards;
use crate::models::cadet::Cadet;
use crate::models::checkin::{Slot, SlotKey};
use crate::models::event::{BotAction, Keyboard, OutboundMessage};
use crate::models::role::Role;
use crate::report::formatter::{
    course_round_report, group_round_report, split_into_chunks, MAX_MESSAGE_CHARS,
};
use crate::schedule::window::fmt_hm;

/// Pause after every outbound send within a job
pub const SEND_DELAY: Duration = Duration::from_millis(50);

/// Per-job delivery tally
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanOutSummary {
    pub delivered: usize,
    pub failed: usize,
    /// Recipients with nothing to send (unregistered, officer record, store error)
    pub skipped: usize,
}

impl FanOutSummary {
    fn record(&mut self, ok: bool) {
        if ok {
            self.delivered += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Send `text` to one recipient, chunked. Stops at the first failed chunk.
async fn send_to(state: &AppState, chat_id: i64, text: &str, keyboard: Option<&Keyboard>) -> bool {
    let chunks = split_into_chunks(text, MAX_MESSAGE_CHARS);
    let last = chunks.len().saturating_sub(1);

    for (i, chunk) in chunks.into_iter().enumerate() {
        let mut message = OutboundMessage::text(chat_id, chunk);
        // Keyboard rides on the final chunk
        if i == last {
            message.keyboard = keyboard.cloned();
        }

        let result = state.messenger.deliver(&BotAction::Send(message)).await;
        tokio::time::sleep(SEND_DELAY).await;

        if let Err(e) = result {
            state.metrics.record_delivery(false);
            warn!(user_id = chat_id, error = %e, "Delivery failed, skipping recipient");
            return false;
        }
        state.metrics.record_delivery(true);
    }

    true
}

/// Registered non-officer record of an admin-cadet, if any
fn admin_record(state: &AppState, admin_id: i64) -> Option<Cadet> {
    match state.store.get_cadet(admin_id) {
        Ok(Some(cadet)) if cadet.group_code != state.config.course.officers_code => Some(cadet),
        Ok(_) => None,
        Err(e) => {
            error!(user_id = admin_id, error = %e, "Failed to load admin-cadet record");
            None
        }
    }
}

/// (checked in, total) for a group and round
fn group_tally(state: &AppState, group_code: &str, key: &SlotKey) -> Result<(usize, usize), StoreError> {
    Ok((
        state.store.group_checked(group_code, key)?,
        state.store.group_total(group_code)?,
    ))
}

pub async fn notify_window_open(state: &AppState, slot: Slot, now: DateTime<Tz>) -> FanOutSummary {
    let mut summary = FanOutSummary::default();
    let key = SlotKey::new(state.windows.local_date(&now), slot);
    let window = state.windows.window(slot);
    let tz = state.windows.timezone();
    let menu = keyboards::role_menu(Role::AdminCadet, state.windows.current_slot(&now).is_some());

    for admin_id in Role::admin_cadets(&state.config.course) {
        let Some(cadet) = admin_record(state, admin_id) else {
            summary.skipped += 1;
            continue;
        };

        let (checked, total) = match group_tally(state, &cadet.group_code, &key) {
            Ok(t) => t,
            Err(e) => {
                error!(user_id = admin_id, group_code = %cadet.group_code, error = %e, "Failed to count group");
                summary.skipped += 1;
                continue;
            }
        };

        let text = format!(
            "Check-in time has started.\nReport by {} ({}). The window closes at {}.\nChecked in: {}/{}",
            fmt_hm(window.deadline),
            tz.name(),
            fmt_hm(window.close),
            checked,
            total
        );
        summary.record(send_to(state, admin_id, &text, Some(&menu)).await);
    }

    summary
}

pub async fn notify_window_close(state: &AppState, slot: Slot) -> FanOutSummary {
    let mut summary = FanOutSummary::default();
    let menu = keyboards::role_menu(Role::AdminCadet, false);
    let text = format!("The {} check-in window is closed.", slot);

    for admin_id in Role::admin_cadets(&state.config.course) {
        if admin_record(state, admin_id).is_none() {
            summary.skipped += 1;
            continue;
        }
        summary.record(send_to(state, admin_id, &text, Some(&menu)).await);
    }

    summary
}

/// Round a report job covers: the last closed window, or today's `slot` if
/// the job fires at a time when that would name a different window.
fn report_key(state: &AppState, slot: Slot, now: &DateTime<Tz>) -> SlotKey {
    let key = state.windows.last_closed_slot(now);
    if key.slot == slot {
        return key;
    }

    warn!(
        expected = %slot,
        resolved = %key.slot,
        "Report job fired outside its window's close, using today's date"
    );
    SlotKey::new(state.windows.local_date(now), slot)
}

/// Course report to officers, own-group report to each admin-cadet
pub async fn send_reports(state: &AppState, slot: Slot, now: DateTime<Tz>) -> FanOutSummary {
    let mut summary = FanOutSummary::default();
    let key = report_key(state, slot, &now);
    let course = &state.config.course;

    let officers = Role::officers(course);
    if !officers.is_empty() {
        match state.store.missing_course(&key, &course.officers_code) {
            Ok(missing) => {
                let text = course_round_report(&key, &missing);
                for officer_id in officers {
                    summary.record(send_to(state, officer_id, &text, None).await);
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to build course report");
                summary.skipped += officers.len();
            }
        }
    }

    for admin_id in Role::admin_cadets(course) {
        let Some(cadet) = admin_record(state, admin_id) else {
            summary.skipped += 1;
            continue;
        };

        match state.store.missing_in_group(&cadet.group_code, &key) {
            Ok(missing) => {
                let text = group_round_report(&key, &cadet.group_code, &missing);
                summary.record(send_to(state, admin_id, &text, None).await);
            }
            Err(e) => {
                error!(user_id = admin_id, group_code = %cadet.group_code, error = %e, "Failed to build group report");
                summary.skipped += 1;
            }
        }
    }

    summary
}

/// Run one schedule entry to completion
pub async fn run_job(state: &AppState, entry: &ScheduleEntry, now: DateTime<Tz>) -> FanOutSummary {
    let summary = match entry.job {
        JobKind::WindowOpen => notify_window_open(state, entry.slot, now).await,
        JobKind::WindowClose => notify_window_close(state, entry.slot).await,
        JobKind::Report => send_reports(state, entry.slot, now).await,
    };

    state.metrics.increment_jobs();
    info!(
        job = ?entry.job,
        slot = %entry.slot,
        delivered = summary.delivered,
        failed = summary.failed,
        skipped = summary.skipped,
        "Scheduled job completed"
    );

    summary
}
