use std::collections::BTreeSet;

use crate::models::user::UserProfile;

/// A failed load settles straight back to `Unauthenticated` with
/// `Session::last_error` set; there is no separate failed phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Unauthenticated,
    Loading,
    Authenticated,
}

/// Who is logged in and what they have applied to.
///
/// `current_user` is only `Some` while `token` is `Some`.
/// `info_loaded` is false only while a profile load is pending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub current_user: Option<UserProfile>,
    pub info_loaded: bool,
    pub applied_job_ids: BTreeSet<i64>,
    pub phase: SessionPhase,
    /// Why the last profile load failed, if it did.
    pub last_error: Option<String>,
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        self.current_user.is_some()
    }

    pub fn has_applied(&self, job_id: i64) -> bool {
        self.applied_job_ids.contains(&job_id)
    }

    pub fn username(&self) -> Option<&str> {
        self.current_user.as_ref().map(|u| u.username.as_str())
    }
}

/// Outcome handed back to a login, signup or profile form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormResult {
    pub success: bool,
    pub errors: Vec<String>,
}

impl FormResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors,
        }
    }
}

/// What `apply_to_job` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    AlreadyApplied,
}
