// Button labels, keyboard layouts and callback action tokens

use crate::core::config::CourseConfig;
use crate::models::event::{InlineButton, Keyboard, ReplyButton};
use crate::models::role::Role;

pub const BTN_CHECKIN: &str = "✅ Check in";
pub const BTN_NOT_REPORTED: &str = "Not reported";
pub const BTN_MY_GROUP: &str = "Stats: my group";
pub const BTN_PICK_GROUP: &str = "Registered: pick group";
pub const BTN_COURSE: &str = "Registered: whole course";
pub const BTN_LAST_REPORT: &str = "Last report";
pub const BTN_SHARE_CONTACT: &str = "📱 Share phone number";

const ACTION_GROUP: &str = "group:";
const ACTION_OFFICER_GROUP: &str = "officer:group:";
const ACTION_RESTART: &str = "reg:restart";
const ACTION_BACK: &str = "nav:back";

/// Parsed button-press token. The payload is client supplied and untrusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    ChooseGroup(String),
    RestartRegistration,
    OfficerGroup(String),
    Back,
    Unknown,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Self {
        if data == ACTION_RESTART {
            CallbackAction::RestartRegistration
        } else if data == ACTION_BACK {
            CallbackAction::Back
        } else if let Some(code) = data.strip_prefix(ACTION_OFFICER_GROUP) {
            CallbackAction::OfficerGroup(code.to_string())
        } else if let Some(code) = data.strip_prefix(ACTION_GROUP) {
            CallbackAction::ChooseGroup(code.to_string())
        } else {
            CallbackAction::Unknown
        }
    }
}

/// Menu buttons recognised in free text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuButton {
    CheckIn,
    NotReported,
    MyGroup,
    PickGroup,
    Course,
    LastReport,
}

impl MenuButton {
    pub fn from_label(text: &str) -> Option<Self> {
        match text.trim() {
            BTN_CHECKIN => Some(MenuButton::CheckIn),
            BTN_NOT_REPORTED => Some(MenuButton::NotReported),
            BTN_MY_GROUP => Some(MenuButton::MyGroup),
            BTN_PICK_GROUP => Some(MenuButton::PickGroup),
            BTN_COURSE => Some(MenuButton::Course),
            BTN_LAST_REPORT => Some(MenuButton::LastReport),
            _ => None,
        }
    }
}

fn reply_rows(labels: &[&str]) -> Keyboard {
    Keyboard::Reply(labels.iter().map(|l| vec![ReplyButton::new(*l)]).collect())
}

/// Persistent reply menu for a role; "Not reported" only while a window is open
pub fn role_menu(role: Role, show_not_reported: bool) -> Keyboard {
    match role {
        Role::Officer => reply_rows(&[BTN_PICK_GROUP, BTN_COURSE, BTN_LAST_REPORT]),
        Role::AdminCadet if show_not_reported => {
            reply_rows(&[BTN_CHECKIN, BTN_NOT_REPORTED, BTN_MY_GROUP, BTN_LAST_REPORT])
        }
        Role::AdminCadet => reply_rows(&[BTN_CHECKIN, BTN_MY_GROUP, BTN_LAST_REPORT]),
        Role::PlainCadet => reply_rows(&[BTN_CHECKIN]),
    }
}

fn two_per_row(buttons: Vec<InlineButton>) -> Vec<Vec<InlineButton>> {
    buttons.chunks(2).map(|pair| pair.to_vec()).collect()
}

/// Training-group picker shown to cadets during registration
pub fn cadet_groups(course: &CourseConfig) -> Keyboard {
    let buttons = course
        .groups
        .iter()
        .map(|g| InlineButton::new(g.as_str(), format!("{}{}", ACTION_GROUP, g)))
        .collect();
    Keyboard::Inline(two_per_row(buttons))
}

/// Single officers option shown to officers during registration
pub fn officer_only(course: &CourseConfig) -> Keyboard {
    Keyboard::Inline(vec![vec![InlineButton::new(
        course.officers_label.as_str(),
        format!("{}{}", ACTION_GROUP, course.officers_code),
    )]])
}

/// Group options matching what this role may register under
pub fn registration_groups(role: Role, course: &CourseConfig) -> Keyboard {
    match role {
        Role::Officer => officer_only(course),
        Role::AdminCadet | Role::PlainCadet => cadet_groups(course),
    }
}

pub fn registered_inline() -> Keyboard {
    Keyboard::Inline(vec![vec![InlineButton::new("Re-register", ACTION_RESTART)]])
}

/// Officer group-stat picker; the officers pseudo-group is never listed
pub fn officer_groups(course: &CourseConfig) -> Keyboard {
    let buttons = course
        .groups
        .iter()
        .map(|g| InlineButton::new(g.as_str(), format!("{}{}", ACTION_OFFICER_GROUP, g)))
        .collect();
    let mut rows = two_per_row(buttons);
    rows.push(vec![InlineButton::new("Back", ACTION_BACK)]);
    Keyboard::Inline(rows)
}

pub fn contact_request() -> Keyboard {
    Keyboard::Reply(vec![vec![ReplyButton::contact(BTN_SHARE_CONTACT)]])
}
