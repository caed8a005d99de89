// Check-in workflow

use tracing::info;

use crate::core::error::HandlerError;
use crate::handlers::context::EventContext;
use crate::models::checkin::Slot;
use crate::models::event::BotAction;
use crate::models::role::Role;
use crate::schedule::window::fmt_hm;

pub const NOT_CHECKIN_TIME: &str = "Not check-in time.";

/// Terminal outcome of one check-in attempt, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckinOutcome {
    NotRegistered,
    OfficerExempt,
    OutsideWindow,
    Recorded(Slot),
    AlreadyRecorded(Slot),
}

pub fn evaluate(ctx: &EventContext<'_>) -> Result<CheckinOutcome, HandlerError> {
    let Some(cadet) = ctx.state.store.get_cadet(ctx.from.user_id)? else {
        return Ok(CheckinOutcome::NotRegistered);
    };

    if ctx.role == Role::Officer || cadet.group_code == ctx.course().officers_code {
        return Ok(CheckinOutcome::OfficerExempt);
    }

    let Some(key) = ctx.state.windows.current_key(&ctx.now) else {
        return Ok(CheckinOutcome::OutsideWindow);
    };

    let inserted = ctx.state.store.record_checkin(ctx.from.user_id, &key)?;
    ctx.state.metrics.record_checkin(inserted);

    info!(
        user_id = ctx.from.user_id,
        group_code = %cadet.group_code,
        date = %key.date_str(),
        slot = %key.slot,
        inserted,
        "Check-in processed"
    );

    Ok(if inserted {
        CheckinOutcome::Recorded(key.slot)
    } else {
        CheckinOutcome::AlreadyRecorded(key.slot)
    })
}

pub fn render(ctx: &EventContext<'_>, outcome: CheckinOutcome) -> String {
    let bounds = |slot: Slot| {
        let window = ctx.state.windows.window(slot);
        format!(
            "Window: {}-{} ({}).",
            fmt_hm(window.start),
            fmt_hm(window.close),
            ctx.state.windows.timezone().name()
        )
    };

    match outcome {
        CheckinOutcome::NotRegistered => "You are not registered. Use /start.".to_string(),
        CheckinOutcome::OfficerExempt => "Officers do not need to check in.".to_string(),
        CheckinOutcome::OutsideWindow => NOT_CHECKIN_TIME.to_string(),
        CheckinOutcome::Recorded(slot) => format!("Check-in accepted. {}", bounds(slot)),
        CheckinOutcome::AlreadyRecorded(slot) => format!("Check-in was already accepted. {}", bounds(slot)),
    }
}

pub fn check_in(ctx: &EventContext<'_>) -> Result<Vec<BotAction>, HandlerError> {
    let outcome = evaluate(ctx)?;
    Ok(vec![ctx.reply(render(ctx, outcome))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::tests::test_state;
    use crate::core::state::AppState;
    use crate::models::event::Sender;
    use crate::schedule::window::tests::at;

    fn sender(user_id: i64) -> Sender {
        Sender { user_id, chat_id: user_id, username: None }
    }

    fn outcome_at(state: &AppState, user_id: i64, h: u32, m: u32) -> CheckinOutcome {
        let from = sender(user_id);
        let ctx = EventContext::new(state, &from, at(&state.windows, h, m, 0));
        evaluate(&ctx).unwrap()
    }

    #[test]
    fn test_unregistered_rejected_first() {
        let (state, _) = test_state(&[]);
        // Even an officer inside a window is "not registered" first
        assert_eq!(outcome_at(&state, 1, 7, 10), CheckinOutcome::NotRegistered);
        assert_eq!(outcome_at(&state, 5, 12, 0), CheckinOutcome::NotRegistered);
    }

    #[test]
    fn test_officer_exempt() {
        let (state, _) = test_state(&[]);
        state.store.upsert_cadet(1, "OFFICERS", "Majorov M. M.", None).unwrap();
        assert_eq!(outcome_at(&state, 1, 7, 10), CheckinOutcome::OfficerExempt);

        // Stale officers-group record for a user no longer in the officer set
        state.store.upsert_cadet(7, "OFFICERS", "Old Record", None).unwrap();
        assert_eq!(outcome_at(&state, 7, 7, 10), CheckinOutcome::OfficerExempt);
    }

    #[test]
    fn test_outside_window() {
        let (state, _) = test_state(&[]);
        state.store.upsert_cadet(5, "841/11", "Ivanov I. I.", None).unwrap();
        assert_eq!(outcome_at(&state, 5, 6, 59), CheckinOutcome::OutsideWindow);
        assert_eq!(outcome_at(&state, 5, 12, 0), CheckinOutcome::OutsideWindow);
        assert_eq!(state.metrics.get_snapshot(&state.sessions).checkins_recorded, 0);
    }

    #[test]
    fn test_recorded_then_duplicate() {
        let (state, _) = test_state(&[]);
        state.store.upsert_cadet(5, "841/11", "Ivanov I. I.", None).unwrap();

        assert_eq!(outcome_at(&state, 5, 7, 0), CheckinOutcome::Recorded(Slot::Morning));
        assert_eq!(outcome_at(&state, 5, 7, 30), CheckinOutcome::AlreadyRecorded(Slot::Morning));
        assert_eq!(outcome_at(&state, 5, 21, 45), CheckinOutcome::Recorded(Slot::Evening));

        let snapshot = state.metrics.get_snapshot(&state.sessions);
        assert_eq!(snapshot.checkins_recorded, 2);
        assert_eq!(snapshot.duplicate_checkins, 1);
    }

    #[test]
    fn test_confirmation_includes_window_bounds() {
        let (state, _) = test_state(&[]);
        state.store.upsert_cadet(5, "841/11", "Ivanov I. I.", None).unwrap();
        let from = sender(5);
        let ctx = EventContext::new(&state, &from, at(&state.windows, 7, 5, 0));

        let actions = check_in(&ctx).unwrap();
        assert_eq!(
            actions[0].text(),
            Some("Check-in accepted. Window: 07:00-07:30 (Europe/Moscow).")
        );

        let actions = check_in(&ctx).unwrap();
        assert!(actions[0].text().unwrap().starts_with("Check-in was already accepted."));
    }
}
