/// A registered course member
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cadet {
    /// Platform user identity
    pub user_id: i64,
    pub group_code: String,
    pub full_name: String,
    /// Platform username without the leading '@'
    pub handle: Option<String>,
    /// Canonical +7XXXXXXXXXX form
    pub phone: Option<String>,
    pub created_at: String,
    pub is_active: bool,
}

/// Name and contact columns used by rosters and missing reports
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CadetContact {
    pub full_name: String,
    pub handle: Option<String>,
    pub phone: Option<String>,
}

impl CadetContact {
    pub fn new(full_name: impl Into<String>, handle: Option<String>, phone: Option<String>) -> Self {
        Self {
            full_name: full_name.into(),
            handle,
            phone,
        }
    }

    /// Phone wins over handle; empty when neither is known
    pub fn contact(&self) -> Option<String> {
        match (&self.phone, &self.handle) {
            (Some(phone), _) if !phone.is_empty() => Some(phone.clone()),
            (_, Some(handle)) if !handle.is_empty() => Some(format!("@{}", handle)),
            _ => None,
        }
    }
}

/// A missing-set row for course-wide reports
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupedContact {
    pub group_code: String,
    pub cadet: CadetContact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_prefers_phone() {
        let c = CadetContact::new("Ivanov I. I.", Some("ivanov".into()), Some("+79991234567".into()));
        assert_eq!(c.contact().as_deref(), Some("+79991234567"));
    }

    #[test]
    fn test_contact_falls_back_to_handle() {
        let c = CadetContact::new("Ivanov I. I.", Some("ivanov".into()), None);
        assert_eq!(c.contact().as_deref(), Some("@ivanov"));
    }

    #[test]
    fn test_contact_absent() {
        let c = CadetContact::new("Ivanov I. I.", None, None);
        assert_eq!(c.contact(), None);
    }
}
