use serde::{Deserialize, Serialize};

use crate::models::job::Job;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub handle: String,
    pub name: String,
    pub description: Option<String>,
    pub num_employees: Option<i64>,
    pub logo_url: Option<String>,
}

/// `GET /companies/:handle` returns the company together with its openings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyDetail {
    #[serde(flatten)]
    pub company: Company,
    #[serde(default)]
    pub jobs: Vec<Job>,
}
