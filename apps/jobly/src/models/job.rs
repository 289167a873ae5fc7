use serde::{Deserialize, Serialize};

/// A job listing. The company fields are absent when the job is nested
/// under a company detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i64,
    pub title: String,
    pub salary: Option<i64>,
    /// Numeric on the backend, serialized as a decimal string.
    pub equity: Option<String>,
    pub company_handle: Option<String>,
    pub company_name: Option<String>,
}
