/// Jobly API client: the single point of entry for all backend calls.
///
/// No other module talks HTTP. Views and the session controller go through
/// the `JoblyBackend` trait so tests can swap in an in-memory backend.
///
/// Credentials are never stored here: every authenticated call takes the
/// bearer token as an argument.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::RequestError;
use crate::models::company::{Company, CompanyDetail};
use crate::models::job::Job;
use crate::models::user::{LoginData, ProfileUpdate, SignupData, UserProfile};

#[cfg(test)]
pub mod mock;

/// Typed operations against the Jobly REST API.
///
/// Carried as `Arc<dyn JoblyBackend>` by the session controller and views.
#[async_trait]
pub trait JoblyBackend: Send + Sync {
    async fn get_companies(
        &self,
        token: Option<&str>,
        name: Option<&str>,
    ) -> Result<Vec<Company>, RequestError>;

    async fn get_company(
        &self,
        token: Option<&str>,
        handle: &str,
    ) -> Result<CompanyDetail, RequestError>;

    async fn get_jobs(
        &self,
        token: Option<&str>,
        title: Option<&str>,
    ) -> Result<Vec<Job>, RequestError>;

    async fn get_current_user(
        &self,
        token: &str,
        username: &str,
    ) -> Result<UserProfile, RequestError>;

    /// Returns the issued token.
    async fn login(&self, data: &LoginData) -> Result<String, RequestError>;

    /// Returns the issued token.
    async fn signup(&self, data: &SignupData) -> Result<String, RequestError>;

    async fn apply_to_job(
        &self,
        token: &str,
        username: &str,
        job_id: i64,
    ) -> Result<(), RequestError>;

    async fn save_profile(
        &self,
        token: &str,
        username: &str,
        data: &ProfileUpdate,
    ) -> Result<UserProfile, RequestError>;
}

#[derive(Debug, Deserialize)]
struct CompaniesResponse {
    companies: Vec<Company>,
}

#[derive(Debug, Deserialize)]
struct CompanyResponse {
    company: CompanyDetail,
}

#[derive(Debug, Deserialize)]
struct JobsResponse {
    jobs: Vec<Job>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: ApiErrorMessage,
}

/// The backend reports validation failures as a list, everything else as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiErrorMessage {
    One(String),
    Many(Vec<String>),
}

/// HTTP implementation of `JoblyBackend`.
#[derive(Clone)]
pub struct JoblyApi {
    client: Client,
    base_url: Url,
}

impl JoblyApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RequestError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RequestError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RequestError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
        })
    }

    /// Appends `segments` to the base URL, percent-encoding each one so
    /// usernames and handles can never add path segments, a query or a fragment.
    fn endpoint_url(&self, segments: &[&str]) -> Result<Url, RequestError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RequestError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issues one request and decodes the JSON body.
    /// GET requests send `params` as the query string; other methods send `body` as JSON.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        token: Option<&str>,
        params: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<T, RequestError> {
        let url = self.endpoint_url(segments)?;
        debug!("API call: {} {}", method, url);

        let mut request = self.client.request(method, url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let messages = parse_error_messages(&body).unwrap_or_else(|| {
                if body.trim().is_empty() {
                    vec![status
                        .canonical_reason()
                        .unwrap_or("Request failed")
                        .to_string()]
                } else {
                    vec![body]
                }
            });
            warn!("API error on {}: {} {:?}", url, status, messages);
            return Err(RequestError::Api {
                status: status.as_u16(),
                messages,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl JoblyBackend for JoblyApi {
    async fn get_companies(
        &self,
        token: Option<&str>,
        name: Option<&str>,
    ) -> Result<Vec<Company>, RequestError> {
        let params = filter_params("name", name);
        let res: CompaniesResponse = self
            .request(Method::GET, &["companies"], token, &params, None)
            .await?;
        Ok(res.companies)
    }

    async fn get_company(
        &self,
        token: Option<&str>,
        handle: &str,
    ) -> Result<CompanyDetail, RequestError> {
        let res: CompanyResponse = self
            .request(
                Method::GET,
                &["companies", handle],
                token,
                &[],
                None,
            )
            .await?;
        Ok(res.company)
    }

    async fn get_jobs(
        &self,
        token: Option<&str>,
        title: Option<&str>,
    ) -> Result<Vec<Job>, RequestError> {
        let params = filter_params("title", title);
        let res: JobsResponse = self
            .request(Method::GET, &["jobs"], token, &params, None)
            .await?;
        Ok(res.jobs)
    }

    async fn get_current_user(
        &self,
        token: &str,
        username: &str,
    ) -> Result<UserProfile, RequestError> {
        let res: UserResponse = self
            .request(
                Method::GET,
                &["users", username],
                Some(token),
                &[],
                None,
            )
            .await?;
        Ok(res.user)
    }

    async fn login(&self, data: &LoginData) -> Result<String, RequestError> {
        let body = serde_json::to_value(data)?;
        let res: TokenResponse = self
            .request(Method::POST, &["auth", "token"], None, &[], Some(body))
            .await?;
        Ok(res.token)
    }

    async fn signup(&self, data: &SignupData) -> Result<String, RequestError> {
        let body = serde_json::to_value(data)?;
        let res: TokenResponse = self
            .request(Method::POST, &["auth", "register"], None, &[], Some(body))
            .await?;
        Ok(res.token)
    }

    async fn apply_to_job(
        &self,
        token: &str,
        username: &str,
        job_id: i64,
    ) -> Result<(), RequestError> {
        // Body is `{applied: id}`; nothing in it is needed beyond success.
        let job_id = job_id.to_string();
        let _: Value = self
            .request(
                Method::POST,
                &["users", username, "jobs", &job_id],
                Some(token),
                &[],
                None,
            )
            .await?;
        Ok(())
    }

    async fn save_profile(
        &self,
        token: &str,
        username: &str,
        data: &ProfileUpdate,
    ) -> Result<UserProfile, RequestError> {
        let body = serde_json::to_value(data)?;
        let res: UserResponse = self
            .request(
                Method::PATCH,
                &["users", username],
                Some(token),
                &[],
                Some(body),
            )
            .await?;
        Ok(res.user)
    }
}

/// Blank search terms mean "no filter", matching an empty search box.
fn filter_params<'a>(key: &'a str, value: Option<&'a str>) -> Vec<(&'a str, &'a str)> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => vec![(key, v)],
        _ => Vec::new(),
    }
}

/// Extracts the `{error: {message}}` list from a backend error body.
fn parse_error_messages(body: &str) -> Option<Vec<String>> {
    let envelope: ApiErrorEnvelope = serde_json::from_str(body).ok()?;
    Some(match envelope.error.message {
        ApiErrorMessage::One(message) => vec![message],
        ApiErrorMessage::Many(messages) => messages,
    })
}
