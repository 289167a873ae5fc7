//! Session controller. Owns the `Session` and every transition of it.
//!
//! State flows one way: token change → profile reload → broadcast on the
//! watch channel → views re-render. Each reload takes a fresh generation
//! number; a reload whose generation is no longer current when its fetch
//! settles is discarded, so the latest token always wins and a logout can
//! never be undone by a late response.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::JoblyBackend;
use crate::errors::SessionError;
use crate::models::user::{LoginData, ProfileUpdate, SignupData, UserProfile};
use crate::token::{claims, TokenStore};

pub mod state;

pub use state::{ApplyOutcome, FormResult, Session, SessionPhase};

/// Shared handle passed to every view.
pub type SessionHandle = Arc<SessionController>;

pub struct SessionController {
    api: Arc<dyn JoblyBackend>,
    store: Arc<dyn TokenStore>,
    state: watch::Sender<Session>,
    generation: AtomicU64,
}

impl SessionController {
    pub fn new(api: Arc<dyn JoblyBackend>, store: Arc<dyn TokenStore>) -> SessionHandle {
        let (state, _) = watch::channel(Session::default());
        Arc::new(Self {
            api,
            store,
            state,
            generation: AtomicU64::new(0),
        })
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn has_applied(&self, job_id: i64) -> bool {
        self.state.borrow().has_applied(job_id)
    }

    /// Derives the session from whatever token was persisted last run.
    pub async fn restore(&self) {
        let token = self.store.get();
        if token.is_some() {
            info!("Restoring session from stored token");
        }
        self.load_current_user(token).await;
    }

    pub async fn login(&self, data: LoginData) -> FormResult {
        match self.api.login(&data).await {
            Ok(token) => {
                self.set_token(Some(token)).await;
                FormResult::ok()
            }
            Err(e) => {
                warn!("Login failed for {}: {e}", data.username);
                FormResult::failed(e.messages())
            }
        }
    }

    pub async fn signup(&self, data: SignupData) -> FormResult {
        match self.api.signup(&data).await {
            Ok(token) => {
                self.set_token(Some(token)).await;
                FormResult::ok()
            }
            Err(e) => {
                warn!("Signup failed for {}: {e}", data.username);
                FormResult::failed(e.messages())
            }
        }
    }

    /// Clears the token and user synchronously. Any reload still in flight
    /// belongs to an older generation and will be dropped when it settles.
    pub fn logout(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.store.set(None) {
            error!("Failed to clear stored token: {e}");
        }
        self.state.send_modify(|s| {
            s.token = None;
            s.current_user = None;
            s.applied_job_ids.clear();
            s.phase = SessionPhase::Unauthenticated;
            s.info_loaded = true;
            s.last_error = None;
        });
        info!("Logged out");
    }

    /// Applies to a job at most once per session.
    ///
    /// The id is recorded before the request goes out so a second call made
    /// while the first is pending is a no-op. If the backend rejects the
    /// application the id is removed again.
    pub async fn apply_to_job(&self, job_id: i64) -> Result<ApplyOutcome, SessionError> {
        let (token, username) = {
            let s = self.state.borrow();
            match (&s.token, &s.current_user) {
                (Some(token), Some(user)) => (token.clone(), user.username.clone()),
                _ => return Err(SessionError::NotAuthenticated),
            }
        };

        let mut inserted = false;
        self.state.send_if_modified(|s| {
            inserted = s.applied_job_ids.insert(job_id);
            inserted
        });
        if !inserted {
            debug!("Job {job_id} already applied; skipping");
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        match self.api.apply_to_job(&token, &username, job_id).await {
            Ok(()) => {
                info!("{username} applied to job {job_id}");
                Ok(ApplyOutcome::Applied)
            }
            Err(e) => {
                error!("Application to job {job_id} failed: {e}");
                if self.generation.load(Ordering::SeqCst) == generation {
                    self.state.send_modify(|s| {
                        s.applied_job_ids.remove(&job_id);
                    });
                }
                Err(SessionError::Apply(e))
            }
        }
    }

    /// Saves profile edits and replaces the current user with the result.
    pub async fn save_profile(&self, update: ProfileUpdate) -> FormResult {
        let (token, username) = {
            let s = self.state.borrow();
            match (&s.token, &s.current_user) {
                (Some(token), Some(user)) => (token.clone(), user.username.clone()),
                _ => return FormResult::failed(vec![SessionError::NotAuthenticated.to_string()]),
            }
        };

        let generation = self.generation.load(Ordering::SeqCst);
        match self.api.save_profile(&token, &username, &update).await {
            Ok(mut user) => {
                if self.generation.load(Ordering::SeqCst) != generation {
                    debug!("Session changed while saving profile; dropping result");
                    return FormResult::ok();
                }
                self.state.send_modify(|s| {
                    // The update response omits applications; keep what we know.
                    user.applications = s.applied_job_ids.iter().copied().collect();
                    s.current_user = Some(user);
                });
                info!("Profile saved for {username}");
                FormResult::ok()
            }
            Err(e) => {
                warn!("Profile update failed for {username}: {e}");
                FormResult::failed(e.messages())
            }
        }
    }

    /// Persists the token, then re-derives the session from it.
    async fn set_token(&self, token: Option<String>) {
        if let Err(e) = self.store.set(token.as_deref()) {
            error!("Failed to persist token: {e}");
        }
        self.load_current_user(token).await;
    }

    async fn load_current_user(&self, token: Option<String>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(token) = token else {
            self.state.send_modify(|s| {
                s.token = None;
                s.current_user = None;
                s.applied_job_ids.clear();
                s.phase = SessionPhase::Unauthenticated;
                s.info_loaded = true;
            });
            return;
        };

        self.state.send_modify(|s| {
            s.token = Some(token.clone());
            s.phase = SessionPhase::Loading;
            s.info_loaded = false;
            s.last_error = None;
        });

        let result = self.fetch_user(&token).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding stale profile load (generation {generation})");
            return;
        }

        match result {
            Ok(user) => {
                info!("Loaded profile for {}", user.username);
                self.state.send_modify(|s| {
                    s.applied_job_ids = user.applications.iter().copied().collect();
                    s.current_user = Some(user);
                    s.phase = SessionPhase::Authenticated;
                    s.info_loaded = true;
                });
            }
            Err(e) => {
                error!("Error with loading user info: {e}");
                self.state.send_modify(|s| {
                    s.current_user = None;
                    s.applied_job_ids.clear();
                    s.phase = SessionPhase::Unauthenticated;
                    s.info_loaded = true;
                    s.last_error = Some(e.to_string());
                });
            }
        }
    }

    async fn fetch_user(&self, token: &str) -> Result<UserProfile, SessionError> {
        let claims = claims::decode(token)?;
        self.api
            .get_current_user(token, &claims.username)
            .await
            .map_err(SessionError::ProfileFetch)
    }
}
