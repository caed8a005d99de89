use dashmap::DashMap;

/// Where a user currently is in the registration flow
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationStep {
    ChooseGroup,
    EnterName { group_code: String },
    EnterContact { group_code: String, full_name: String },
}

/// In-memory registration progress keyed by user identity.
///
/// Nothing here is persisted; losing it (e.g. on restart) only means the
/// user has to start over.
pub struct RegistrationSessions {
    sessions: DashMap<i64, RegistrationStep>,
}

impl RegistrationSessions {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Replace the user's step
    pub fn set(&self, user_id: i64, step: RegistrationStep) {
        self.sessions.insert(user_id, step);
    }

    /// Returns a clone of the current step if the user is mid-registration
    pub fn get(&self, user_id: i64) -> Option<RegistrationStep> {
        self.sessions.get(&user_id).map(|entry| entry.value().clone())
    }

    pub fn clear(&self, user_id: i64) {
        self.sessions.remove(&user_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for RegistrationSessions {
    fn default() -> Self {
        Self::new()
    }
}
