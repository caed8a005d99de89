use chrono::DateTime;
use chrono_tz::Tz;

use crate::core::config::CourseConfig;
use crate::core::state::AppState;
use crate::handlers::keyboards;
use crate::models::event::{BotAction, Keyboard, OutboundMessage, Sender};
use crate::models::role::Role;
use crate::report::formatter::{split_into_chunks, MAX_MESSAGE_CHARS};

/// Everything a handler needs for one inbound event.
///
/// The role is resolved once per event from the configured identity sets.
pub struct EventContext<'a> {
    pub state: &'a AppState,
    pub from: &'a Sender,
    pub role: Role,
    pub now: DateTime<Tz>,
}

impl<'a> EventContext<'a> {
    pub fn new(state: &'a AppState, from: &'a Sender, now: DateTime<Tz>) -> Self {
        let role = Role::resolve(from.user_id, &state.config.course);
        Self { state, from, role, now }
    }

    pub fn course(&self) -> &CourseConfig {
        &self.state.config.course
    }

    pub fn reply(&self, text: impl Into<String>) -> BotAction {
        BotAction::send(self.from.chat_id, text)
    }

    pub fn reply_with(&self, text: impl Into<String>, keyboard: Keyboard) -> BotAction {
        BotAction::Send(OutboundMessage::text(self.from.chat_id, text).with_keyboard(keyboard))
    }

    /// Long text split into several messages on line boundaries
    pub fn reply_chunked(&self, text: &str) -> Vec<BotAction> {
        split_into_chunks(text, MAX_MESSAGE_CHARS)
            .into_iter()
            .map(|chunk| self.reply(chunk))
            .collect()
    }

    /// Edit the message behind a button press, or send anew when it is unknown
    pub fn edit_or_reply(&self, message_id: Option<i64>, text: impl Into<String>, keyboard: Option<Keyboard>) -> BotAction {
        match message_id {
            Some(message_id) => BotAction::Edit {
                chat_id: self.from.chat_id,
                message_id,
                text: text.into(),
                keyboard,
            },
            None => BotAction::Send(OutboundMessage {
                chat_id: self.from.chat_id,
                text: text.into(),
                keyboard,
            }),
        }
    }

    /// Whether an admin-cadet should currently see the "Not reported" action
    pub fn show_not_reported(&self) -> bool {
        self.role == Role::AdminCadet && self.state.windows.current_slot(&self.now).is_some()
    }

    pub fn menu(&self) -> BotAction {
        self.reply_with(
            "Menu available.",
            keyboards::role_menu(self.role, self.show_not_reported()),
        )
    }
}
