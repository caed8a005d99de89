// Inbound event routing and action delivery

use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{debug, error, info, instrument, warn};

use crate::core::error::HandlerError;
use crate::core::state::AppState;
use crate::handlers::context::EventContext;
use crate::handlers::keyboards::{CallbackAction, MenuButton};
use crate::handlers::registration::ContactInput;
use crate::handlers::{admin_menu, checkin, registration};
use crate::models::event::{BotAction, InboundEvent, Sender};
use crate::stores::sessions::RegistrationStep;

const GENERIC_ERROR: &str = "Something went wrong. Please try again later.";

/// Route one inbound event to its handler.
///
/// Menu buttons win over registration text input; free text with no
/// registration in progress gets no reply.
pub fn handle_event(
    state: &AppState,
    event: &InboundEvent,
    now: DateTime<Tz>,
) -> Result<Vec<BotAction>, HandlerError> {
    let from = event.sender();
    refresh_handle(state, from)?;

    let ctx = EventContext::new(state, from, now);

    match event {
        InboundEvent::Start { .. } => registration::start(&ctx),

        InboundEvent::Callback { callback_id, message_id, data, .. } => {
            match CallbackAction::parse(data) {
                CallbackAction::ChooseGroup(code) => {
                    Ok(registration::choose_group(&ctx, callback_id, *message_id, &code))
                }
                CallbackAction::RestartRegistration => {
                    Ok(registration::restart(&ctx, callback_id, *message_id))
                }
                CallbackAction::OfficerGroup(code) => {
                    admin_menu::officer_group_stats(&ctx, callback_id, *message_id, &code)
                }
                CallbackAction::Back => Ok(admin_menu::nav_back(&ctx, callback_id, *message_id)),
                CallbackAction::Unknown => {
                    debug!(user_id = from.user_id, data = %data, "Unknown callback token");
                    Ok(vec![BotAction::ack(callback_id)])
                }
            }
        }

        InboundEvent::Contact { owner_id, phone, .. } => match state.sessions.get(from.user_id) {
            Some(RegistrationStep::EnterContact { group_code, full_name }) => registration::enter_contact(
                &ctx,
                &group_code,
                &full_name,
                ContactInput::Shared {
                    owner_id: *owner_id,
                    phone: phone.clone(),
                },
            ),
            _ => Ok(Vec::new()),
        },

        InboundEvent::Text { text, .. } => {
            if let Some(button) = MenuButton::from_label(text) {
                return match button {
                    MenuButton::CheckIn => checkin::check_in(&ctx),
                    MenuButton::NotReported => admin_menu::not_reported(&ctx),
                    MenuButton::MyGroup => admin_menu::my_group_stats(&ctx),
                    MenuButton::PickGroup => Ok(admin_menu::officer_pick_group(&ctx)),
                    MenuButton::Course => admin_menu::course_stats(&ctx),
                    MenuButton::LastReport => admin_menu::last_report(&ctx),
                };
            }

            match state.sessions.get(from.user_id) {
                Some(RegistrationStep::EnterName { group_code }) => {
                    registration::enter_name(&ctx, &group_code, text)
                }
                Some(RegistrationStep::EnterContact { group_code, full_name }) => registration::enter_contact(
                    &ctx,
                    &group_code,
                    &full_name,
                    ContactInput::Manual(text.clone()),
                ),
                Some(RegistrationStep::ChooseGroup) => {
                    Ok(vec![ctx.reply("Choose a group using the buttons above.")])
                }
                None => Ok(Vec::new()),
            }
        }
    }
}

/// Keep the stored handle in step with the platform username
fn refresh_handle(state: &AppState, from: &Sender) -> Result<(), HandlerError> {
    let Some(username) = from.username.as_deref() else {
        return Ok(());
    };

    if let Some(cadet) = state.store.get_cadet(from.user_id)? {
        if cadet.handle.as_deref() != Some(username) {
            state.store.set_handle(from.user_id, Some(username))?;
            debug!(user_id = from.user_id, handle = %username, "Handle refreshed");
        }
    }

    Ok(())
}

/// Handle one event and push the resulting actions through the messenger
#[instrument(skip(state, event), fields(user_id = event.sender().user_id))]
pub async fn process_event(state: &AppState, event: InboundEvent) {
    state.metrics.increment_events();
    let chat_id = event.sender().chat_id;

    let actions = match handle_event(state, &event, state.windows.now()) {
        Ok(actions) => actions,
        Err(e) => {
            error!(error = %e, "Handler failed");
            state.metrics.increment_handler_errors();
            vec![BotAction::send(chat_id, GENERIC_ERROR)]
        }
    };

    for action in &actions {
        match state.messenger.deliver(action).await {
            Ok(()) => state.metrics.record_delivery(true),
            Err(e) => {
                state.metrics.record_delivery(false);
                if e.is_recipient_unreachable() {
                    info!(chat_id, error = %e, "Recipient unreachable, dropping reply");
                } else {
                    warn!(chat_id, error = %e, "Failed to deliver reply");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::tests::test_state;
    use crate::handlers::keyboards::{BTN_CHECKIN, BTN_COURSE, BTN_NOT_REPORTED};
    use crate::schedule::window::tests::at;

    fn sender(user_id: i64, username: Option<&str>) -> Sender {
        Sender {
            user_id,
            chat_id: user_id,
            username: username.map(String::from),
        }
    }

    fn text(user_id: i64, body: &str) -> InboundEvent {
        InboundEvent::Text {
            from: sender(user_id, None),
            text: body.to_string(),
        }
    }

    fn callback(user_id: i64, data: &str) -> InboundEvent {
        InboundEvent::Callback {
            from: sender(user_id, None),
            callback_id: "cb".to_string(),
            message_id: Some(1),
            data: data.to_string(),
        }
    }

    #[test]
    fn test_full_registration_through_dispatch() {
        let (state, _) = test_state(&[]);
        let now = at(&state.windows, 7, 10, 0);

        handle_event(&state, &InboundEvent::Start { from: sender(5, Some("ivanov")) }, now).unwrap();
        handle_event(&state, &callback(5, "group:841/12"), now).unwrap();
        handle_event(&state, &text(5, "Ivanov Ivan"), now).unwrap();
        let contact = InboundEvent::Contact {
            from: sender(5, Some("ivanov")),
            owner_id: Some(5),
            phone: "+7 999 123-45-67".to_string(),
        };
        handle_event(&state, &contact, now).unwrap();

        let cadet = state.store.get_cadet(5).unwrap().unwrap();
        assert_eq!(cadet.group_code, "841/12");
        assert_eq!(cadet.phone.as_deref(), Some("+79991234567"));
        assert!(state.sessions.get(5).is_none());

        let actions = handle_event(&state, &text(5, BTN_CHECKIN), now).unwrap();
        assert!(actions[0].text().unwrap().starts_with("Check-in accepted"));
    }

    #[test]
    fn test_menu_button_wins_over_name_step() {
        let (state, _) = test_state(&[]);
        state.sessions.set(5, RegistrationStep::EnterName { group_code: "841/11".into() });

        let actions = handle_event(&state, &text(5, BTN_CHECKIN), at(&state.windows, 7, 10, 0)).unwrap();
        assert_eq!(actions[0].text(), Some("You are not registered. Use /start."));
        assert!(state.store.get_cadet(5).unwrap().is_none());
    }

    #[test]
    fn test_free_text_without_session_is_ignored() {
        let (state, _) = test_state(&[]);
        let actions = handle_event(&state, &text(5, "hello"), at(&state.windows, 12, 0, 0)).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_contact_without_session_is_ignored() {
        let (state, _) = test_state(&[]);
        let contact = InboundEvent::Contact {
            from: sender(5, None),
            owner_id: Some(5),
            phone: "79991234567".to_string(),
        };
        assert!(handle_event(&state, &contact, at(&state.windows, 12, 0, 0)).unwrap().is_empty());
    }

    #[test]
    fn test_role_gated_buttons_silent_for_plain_cadet() {
        let (state, _) = test_state(&[]);
        let now = at(&state.windows, 7, 10, 0);
        assert!(handle_event(&state, &text(5, BTN_NOT_REPORTED), now).unwrap().is_empty());
        assert!(handle_event(&state, &text(5, BTN_COURSE), now).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_callback_acknowledged() {
        let (state, _) = test_state(&[]);
        let actions = handle_event(&state, &callback(5, "bogus"), at(&state.windows, 12, 0, 0)).unwrap();
        assert_eq!(actions, vec![BotAction::ack("cb")]);
    }

    #[test]
    fn test_handle_refreshed_on_any_event() {
        let (state, _) = test_state(&[]);
        state.store.upsert_cadet(5, "841/11", "Ivanov I. I.", Some("old")).unwrap();

        let event = InboundEvent::Text {
            from: sender(5, Some("new")),
            text: "hello".to_string(),
        };
        handle_event(&state, &event, at(&state.windows, 12, 0, 0)).unwrap();
        assert_eq!(state.store.get_cadet(5).unwrap().unwrap().handle.as_deref(), Some("new"));

        // Missing username leaves the stored handle alone
        handle_event(&state, &text(5, "hello"), at(&state.windows, 12, 0, 0)).unwrap();
        assert_eq!(state.store.get_cadet(5).unwrap().unwrap().handle.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_process_event_delivers_and_counts() {
        let (state, messenger) = test_state(&[]);
        process_event(&state, InboundEvent::Start { from: sender(5, None) }).await;

        let sent = messenger.sent_to(5);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], "Menu available.");
        assert_eq!(sent[1], "Choose your training group:");

        let snapshot = state.metrics.get_snapshot(&state.sessions);
        assert_eq!(snapshot.events_handled, 1);
        assert_eq!(snapshot.deliveries_ok, 2);
        assert_eq!(snapshot.registrations_in_progress, 1);
    }

    #[tokio::test]
    async fn test_process_event_survives_unreachable_chat() {
        let (state, messenger) = test_state(&[5]);
        process_event(&state, InboundEvent::Start { from: sender(5, None) }).await;

        assert!(messenger.sent_to(5).is_empty());
        let snapshot = state.metrics.get_snapshot(&state.sessions);
        assert_eq!(snapshot.deliveries_failed, 2);
        assert_eq!(snapshot.handler_errors, 0);
    }
}
