// Inbound events and outbound actions exchanged with the transport layer

/// Who triggered an inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Registration-start trigger (/start)
    Start { from: Sender },
    Text { from: Sender, text: String },
    /// Button press carrying an opaque action token
    Callback {
        from: Sender,
        callback_id: String,
        message_id: Option<i64>,
        data: String,
    },
    /// Native contact share; `owner_id` is the identity the contact belongs to
    Contact {
        from: Sender,
        owner_id: Option<i64>,
        phone: String,
    },
}

impl InboundEvent {
    pub fn sender(&self) -> &Sender {
        match self {
            InboundEvent::Start { from }
            | InboundEvent::Text { from, .. }
            | InboundEvent::Callback { from, .. }
            | InboundEvent::Contact { from, .. } => from,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyButton {
    pub text: String,
    pub request_contact: bool,
}

impl ReplyButton {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_contact: false,
        }
    }

    pub fn contact(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_contact: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub action: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: action.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    Reply(Vec<Vec<ReplyButton>>),
    Inline(Vec<Vec<InlineButton>>),
    RemoveReply,
}

impl Keyboard {
    /// Reply-keyboard labels in row order, for assertions and logging
    pub fn reply_labels(&self) -> Vec<&str> {
        match self {
            Keyboard::Reply(rows) => rows.iter().flatten().map(|b| b.text.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn inline_actions(&self) -> Vec<&str> {
        match self {
            Keyboard::Inline(rows) => rows.iter().flatten().map(|b| b.action.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl OutboundMessage {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// One effect handed to the transport layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotAction {
    Send(OutboundMessage),
    AnswerCallback {
        callback_id: String,
        text: Option<String>,
        alert: bool,
    },
    /// Replace the text (and inline keyboard) of a previously sent message
    Edit {
        chat_id: i64,
        message_id: i64,
        text: String,
        keyboard: Option<Keyboard>,
    },
}

impl BotAction {
    pub fn send(chat_id: i64, text: impl Into<String>) -> Self {
        BotAction::Send(OutboundMessage::text(chat_id, text))
    }

    pub fn ack(callback_id: &str) -> Self {
        BotAction::AnswerCallback {
            callback_id: callback_id.to_string(),
            text: None,
            alert: false,
        }
    }

    pub fn alert(callback_id: &str, text: impl Into<String>) -> Self {
        BotAction::AnswerCallback {
            callback_id: callback_id.to_string(),
            text: Some(text.into()),
            alert: true,
        }
    }

    /// Text carried by this action, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            BotAction::Send(msg) => Some(&msg.text),
            BotAction::AnswerCallback { text, .. } => text.as_deref(),
            BotAction::Edit { text, .. } => Some(text),
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            BotAction::Send(msg) => msg.keyboard.as_ref(),
            BotAction::Edit { keyboard, .. } => keyboard.as_ref(),
            BotAction::AnswerCallback { .. } => None,
        }
    }
}
