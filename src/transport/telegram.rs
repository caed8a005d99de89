// Telegram Bot API adapter

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::core::config::BotConfig;
use crate::core::error::TransportError;
use crate::models::event::{BotAction, InboundEvent, Keyboard, Sender};
use crate::transport::messenger::Messenger;

const START_COMMAND: &str = "/start";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub contact: Option<Contact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub phone_number: String,
    /// Present only when the contact is a Telegram user
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

fn sender(user: &User, chat_id: i64) -> Sender {
    Sender {
        user_id: user.id,
        chat_id,
        username: user.username.clone(),
    }
}

fn is_start_command(text: &str) -> bool {
    // "/start", "/start payload" and "/start@SomeBot" all count
    text.split_whitespace()
        .next()
        .and_then(|cmd| cmd.split('@').next())
        .is_some_and(|cmd| cmd == START_COMMAND)
}

/// Map an update to a core event; updates the bot does not act on map to None
pub fn to_event(update: &Update) -> Option<InboundEvent> {
    if let Some(cb) = &update.callback_query {
        let chat_id = cb.message.as_ref().map(|m| m.chat.id).unwrap_or(cb.from.id);
        return Some(InboundEvent::Callback {
            from: sender(&cb.from, chat_id),
            callback_id: cb.id.clone(),
            message_id: cb.message.as_ref().map(|m| m.message_id),
            data: cb.data.clone().unwrap_or_default(),
        });
    }

    let message = update.message.as_ref()?;
    let from = sender(message.from.as_ref()?, message.chat.id);

    if let Some(contact) = &message.contact {
        return Some(InboundEvent::Contact {
            from,
            owner_id: contact.user_id,
            phone: contact.phone_number.clone(),
        });
    }

    let text = message.text.as_ref()?;
    if is_start_command(text) {
        Some(InboundEvent::Start { from })
    } else {
        Some(InboundEvent::Text {
            from,
            text: text.clone(),
        })
    }
}

/// `reply_markup` JSON for a keyboard
fn reply_markup(keyboard: &Keyboard) -> Value {
    match keyboard {
        Keyboard::Reply(rows) => {
            let one_time = rows.iter().flatten().any(|b| b.request_contact);
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| {
                            if b.request_contact {
                                json!({ "text": b.text, "request_contact": true })
                            } else {
                                json!({ "text": b.text })
                            }
                        })
                        .collect()
                })
                .collect();
            json!({ "keyboard": rows, "resize_keyboard": true, "one_time_keyboard": one_time })
        }
        Keyboard::Inline(rows) => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| json!({ "text": b.text, "callback_data": b.action }))
                        .collect()
                })
                .collect();
            json!({ "inline_keyboard": rows })
        }
        Keyboard::RemoveReply => json!({ "remove_keyboard": true }),
    }
}

/// Bot API method and JSON body for one action
pub fn action_request(action: &BotAction) -> (&'static str, Value) {
    match action {
        BotAction::Send(msg) => {
            let mut body = json!({ "chat_id": msg.chat_id, "text": msg.text });
            if let Some(kb) = &msg.keyboard {
                body["reply_markup"] = reply_markup(kb);
            }
            ("sendMessage", body)
        }
        BotAction::AnswerCallback { callback_id, text, alert } => {
            let mut body = json!({ "callback_query_id": callback_id, "show_alert": alert });
            if let Some(text) = text {
                body["text"] = json!(text);
            }
            ("answerCallbackQuery", body)
        }
        BotAction::Edit { chat_id, message_id, text, keyboard } => {
            let mut body = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
            // Edited messages can only carry inline keyboards
            if let Some(kb @ Keyboard::Inline(_)) = keyboard {
                body["reply_markup"] = reply_markup(kb);
            }
            ("editMessageText", body)
        }
    }
}

pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
    poll_timeout_secs: u64,
}

impl TelegramClient {
    pub fn new(config: &BotConfig) -> Result<Self> {
        // Must outlive the long-poll itself
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", config.api_base.trim_end_matches('/'), config.token),
            poll_timeout_secs: config.poll_timeout_secs,
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, TransportError> {
        // Errors are stripped of the URL, which embeds the bot token
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.without_url()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Http(e.without_url()))?;

        parse_response(&bytes)
    }

    /// One long-poll round; `offset` acknowledges everything before it
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TransportError> {
        let mut body = json!({
            "timeout": self.poll_timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }

        self.call("getUpdates", &body).await
    }
}

fn parse_response<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TransportError> {
    let parsed: ApiResponse<T> =
        serde_json::from_slice(bytes).map_err(|e| TransportError::Decode(e.to_string()))?;

    if !parsed.ok {
        return Err(TransportError::Api {
            code: parsed.error_code.unwrap_or_default(),
            description: parsed.description.unwrap_or_default(),
        });
    }

    parsed
        .result
        .ok_or_else(|| TransportError::Decode("response has no result".to_string()))
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn deliver(&self, action: &BotAction) -> Result<(), TransportError> {
        let (method, body) = action_request(action);
        self.call::<Value>(method, &body).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::keyboards;
    use crate::models::event::OutboundMessage;
    use crate::models::role::Role;

    fn update(raw: Value) -> Update {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_start_command_variants() {
        assert!(is_start_command("/start"));
        assert!(is_start_command("/start ref123"));
        assert!(is_start_command("/start@RollcallBot"));
        assert!(!is_start_command("/stats"));
        assert!(!is_start_command("start"));
    }

    #[test]
    fn test_text_and_start_updates() {
        let start = update(json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "chat": { "id": 555 },
                "from": { "id": 5, "username": "ivanov" },
                "text": "/start"
            }
        }));
        assert_eq!(
            to_event(&start),
            Some(InboundEvent::Start {
                from: Sender { user_id: 5, chat_id: 555, username: Some("ivanov".into()) }
            })
        );

        let text = update(json!({
            "update_id": 2,
            "message": { "message_id": 11, "chat": { "id": 555 }, "from": { "id": 5 }, "text": "Ivanov I. I." }
        }));
        assert!(matches!(to_event(&text), Some(InboundEvent::Text { text, .. }) if text == "Ivanov I. I."));
    }

    #[test]
    fn test_contact_update() {
        let contact = update(json!({
            "update_id": 3,
            "message": {
                "message_id": 12,
                "chat": { "id": 5 },
                "from": { "id": 5 },
                "contact": { "phone_number": "79991234567", "first_name": "Ivan", "user_id": 5 }
            }
        }));
        assert_eq!(
            to_event(&contact),
            Some(InboundEvent::Contact {
                from: Sender { user_id: 5, chat_id: 5, username: None },
                owner_id: Some(5),
                phone: "79991234567".into(),
            })
        );
    }

    #[test]
    fn test_callback_update() {
        let cb = update(json!({
            "update_id": 4,
            "callback_query": {
                "id": "q1",
                "from": { "id": 5 },
                "message": { "message_id": 20, "chat": { "id": 5 }, "date": 0 },
                "data": "group:841/11"
            }
        }));
        assert_eq!(
            to_event(&cb),
            Some(InboundEvent::Callback {
                from: Sender { user_id: 5, chat_id: 5, username: None },
                callback_id: "q1".into(),
                message_id: Some(20),
                data: "group:841/11".into(),
            })
        );
    }

    #[test]
    fn test_unhandled_updates_ignored() {
        let photo = update(json!({
            "update_id": 5,
            "message": { "message_id": 13, "chat": { "id": 5 }, "from": { "id": 5 } }
        }));
        assert_eq!(to_event(&photo), None);

        let channel = update(json!({ "update_id": 6 }));
        assert_eq!(to_event(&channel), None);
    }

    #[test]
    fn test_send_with_reply_keyboard() {
        let action = BotAction::Send(
            OutboundMessage::text(5, "Menu available.").with_keyboard(keyboards::role_menu(Role::PlainCadet, false)),
        );
        let (method, body) = action_request(&action);

        assert_eq!(method, "sendMessage");
        assert_eq!(body["chat_id"], 5);
        assert_eq!(body["reply_markup"]["keyboard"][0][0]["text"], keyboards::BTN_CHECKIN);
        assert_eq!(body["reply_markup"]["one_time_keyboard"], false);
    }

    #[test]
    fn test_contact_keyboard_requests_contact() {
        let action = BotAction::Send(OutboundMessage::text(5, "Share").with_keyboard(keyboards::contact_request()));
        let (_, body) = action_request(&action);

        assert_eq!(body["reply_markup"]["keyboard"][0][0]["request_contact"], true);
        assert_eq!(body["reply_markup"]["one_time_keyboard"], true);
    }

    #[test]
    fn test_edit_drops_reply_keyboard() {
        let inline = BotAction::Edit {
            chat_id: 5,
            message_id: 9,
            text: "Pick".into(),
            keyboard: Some(keyboards::registered_inline()),
        };
        let (method, body) = action_request(&inline);
        assert_eq!(method, "editMessageText");
        assert_eq!(body["reply_markup"]["inline_keyboard"][0][0]["callback_data"], "reg:restart");

        let reply = BotAction::Edit {
            chat_id: 5,
            message_id: 9,
            text: "Pick".into(),
            keyboard: Some(keyboards::contact_request()),
        };
        let (_, body) = action_request(&reply);
        assert!(body.get("reply_markup").is_none());
    }

    #[test]
    fn test_answer_callback_alert() {
        let (method, body) = action_request(&BotAction::alert("q1", "Insufficient rights"));
        assert_eq!(method, "answerCallbackQuery");
        assert_eq!(body["show_alert"], true);
        assert_eq!(body["text"], "Insufficient rights");
    }

    #[test]
    fn test_parse_api_error() {
        let err = parse_response::<Value>(
            br#"{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}"#,
        )
        .unwrap_err();
        assert!(err.is_recipient_unreachable());

        let ok: Vec<Update> = parse_response(br#"{"ok":true,"result":[]}"#).unwrap();
        assert!(ok.is_empty());

        assert!(matches!(parse_response::<Value>(b"not json"), Err(TransportError::Decode(_))));
    }
}
