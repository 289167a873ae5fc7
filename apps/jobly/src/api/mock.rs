//! In-memory `JoblyBackend` for session and view tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::JoblyBackend;
use crate::errors::RequestError;
use crate::models::company::{Company, CompanyDetail};
use crate::models::job::Job;
use crate::models::user::{LoginData, ProfileUpdate, SignupData, UserProfile};
use crate::token::claims::encode_unsigned;

/// Username whose profile fetch blocks until `release` is notified.
pub const SLOW_USER: &str = "slowpoke";

#[derive(Default)]
pub struct MockBackend {
    pub users: Mutex<HashMap<String, UserProfile>>,
    pub passwords: Mutex<HashMap<String, String>>,
    pub apply_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    pub fail_apply: AtomicBool,
    /// When set, applications and profile saves also block on `release`.
    pub hold_writes: AtomicBool,
    /// Signalled when a blocking call has started.
    pub entered: Notify,
    /// Lets one blocked call finish.
    pub release: Notify,
}

pub fn profile(username: &str, applications: &[i64]) -> UserProfile {
    UserProfile {
        username: username.to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        email: format!("{username}@example.com"),
        is_admin: false,
        applications: applications.to_vec(),
    }
}

pub fn job(id: i64, title: &str, company: &str) -> Job {
    Job {
        id,
        title: title.to_string(),
        salary: Some(100_000),
        equity: None,
        company_handle: Some(company.to_string()),
        company_name: Some(company.to_uppercase()),
    }
}

impl MockBackend {
    pub fn with_user(username: &str, password: &str, applications: &[i64]) -> Self {
        let backend = Self::default();
        backend.add_user(username, password, applications);
        backend
    }

    pub fn add_user(&self, username: &str, password: &str, applications: &[i64]) {
        self.users
            .lock()
            .unwrap()
            .insert(username.to_string(), profile(username, applications));
        self.passwords
            .lock()
            .unwrap()
            .insert(username.to_string(), password.to_string());
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    async fn gate(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }

    fn bad_request(message: &str) -> RequestError {
        RequestError::Api {
            status: 400,
            messages: vec![message.to_string()],
        }
    }
}

#[async_trait]
impl JoblyBackend for MockBackend {
    async fn get_companies(
        &self,
        _token: Option<&str>,
        name: Option<&str>,
    ) -> Result<Vec<Company>, RequestError> {
        let companies = vec![
            Company {
                handle: "acme".into(),
                name: "Acme Corp".into(),
                description: Some("Anvils".into()),
                num_employees: Some(50),
                logo_url: None,
            },
            Company {
                handle: "globex".into(),
                name: "Globex".into(),
                description: None,
                num_employees: None,
                logo_url: None,
            },
        ];
        Ok(match name {
            Some(n) => companies
                .into_iter()
                .filter(|c| c.name.to_lowercase().contains(&n.to_lowercase()))
                .collect(),
            None => companies,
        })
    }

    async fn get_company(
        &self,
        token: Option<&str>,
        handle: &str,
    ) -> Result<CompanyDetail, RequestError> {
        let company = self
            .get_companies(token, None)
            .await?
            .into_iter()
            .find(|c| c.handle == handle)
            .ok_or_else(|| RequestError::Api {
                status: 404,
                messages: vec![format!("No company: {handle}")],
            })?;
        Ok(CompanyDetail {
            company,
            jobs: vec![job(7, "Anvil Tester", handle)],
        })
    }

    async fn get_jobs(
        &self,
        _token: Option<&str>,
        title: Option<&str>,
    ) -> Result<Vec<Job>, RequestError> {
        let jobs = vec![job(3, "Roadrunner Catcher", "acme"), job(7, "Anvil Tester", "acme")];
        Ok(match title {
            Some(t) => jobs.into_iter().filter(|j| j.title.contains(t)).collect(),
            None => jobs,
        })
    }

    async fn get_current_user(
        &self,
        _token: &str,
        username: &str,
    ) -> Result<UserProfile, RequestError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        if username == SLOW_USER {
            self.gate().await;
        }
        self.users
            .lock()
            .unwrap()
            .get(username)
            .cloned()
            .ok_or_else(|| RequestError::Api {
                status: 404,
                messages: vec![format!("No user: {username}")],
            })
    }

    async fn login(&self, data: &LoginData) -> Result<String, RequestError> {
        let passwords = self.passwords.lock().unwrap();
        match passwords.get(&data.username) {
            Some(p) if *p == data.password => Ok(encode_unsigned(&data.username)),
            _ => Err(RequestError::Api {
                status: 401,
                messages: vec!["Invalid username/password".to_string()],
            }),
        }
    }

    async fn signup(&self, data: &SignupData) -> Result<String, RequestError> {
        if self.users.lock().unwrap().contains_key(&data.username) {
            return Err(Self::bad_request(&format!(
                "Duplicate username: {}",
                data.username
            )));
        }
        self.add_user(&data.username, &data.password, &[]);
        Ok(encode_unsigned(&data.username))
    }

    async fn apply_to_job(
        &self,
        _token: &str,
        _username: &str,
        _job_id: i64,
    ) -> Result<(), RequestError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_writes.load(Ordering::SeqCst) {
            self.gate().await;
        }
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(Self::bad_request("Application rejected"));
        }
        Ok(())
    }

    async fn save_profile(
        &self,
        _token: &str,
        username: &str,
        data: &ProfileUpdate,
    ) -> Result<UserProfile, RequestError> {
        if self.hold_writes.load(Ordering::SeqCst) {
            self.gate().await;
        }
        if data.email.as_deref().map_or(false, |e| !e.contains('@')) {
            return Err(Self::bad_request("instance.email is invalid"));
        }
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(username).ok_or_else(|| RequestError::Api {
            status: 404,
            messages: vec![format!("No user: {username}")],
        })?;
        if let Some(first) = &data.first_name {
            user.first_name = first.clone();
        }
        if let Some(last) = &data.last_name {
            user.last_name = last.clone();
        }
        if let Some(email) = &data.email {
            user.email = email.clone();
        }
        // The PATCH response does not list applications.
        let mut updated = user.clone();
        updated.applications.clear();
        Ok(updated)
    }
}
