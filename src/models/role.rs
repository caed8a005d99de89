use crate::core::config::CourseConfig;

/// Effective role of a user, derived from the configured identity sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Officer,
    AdminCadet,
    PlainCadet,
}

impl Role {
    /// Officer membership takes priority over admin membership
    pub fn resolve(user_id: i64, course: &CourseConfig) -> Self {
        if course.officer_ids.contains(&user_id) {
            Role::Officer
        } else if course.admin_ids.contains(&user_id) {
            Role::AdminCadet
        } else {
            Role::PlainCadet
        }
    }

    /// Whether this role may register under `group_code`
    pub fn may_register_in(&self, group_code: &str, course: &CourseConfig) -> bool {
        match self {
            Role::Officer => group_code == course.officers_code,
            Role::AdminCadet | Role::PlainCadet => course.is_training_group(group_code),
        }
    }

    /// Admin-cadets, in a stable order
    pub fn admin_cadets(course: &CourseConfig) -> Vec<i64> {
        let mut ids: Vec<i64> = course
            .admin_ids
            .iter()
            .copied()
            .filter(|id| Role::resolve(*id, course) == Role::AdminCadet)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn officers(course: &CourseConfig) -> Vec<i64> {
        let mut ids: Vec<i64> = course.officer_ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}
