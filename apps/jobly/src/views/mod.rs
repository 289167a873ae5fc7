//! Text views. Each view gets its collaborators through `ViewContext`
//! and renders to a `String`; nothing here mutates the session.

use std::sync::Arc;

use tracing::warn;

use crate::api::JoblyBackend;
use crate::errors::RequestError;
use crate::models::company::Company;
use crate::models::job::Job;
use crate::routes::Route;
use crate::session::{Session, SessionHandle};

#[derive(Clone)]
pub struct ViewContext {
    pub session: SessionHandle,
    pub api: Arc<dyn JoblyBackend>,
}

impl ViewContext {
    pub fn new(session: SessionHandle, api: Arc<dyn JoblyBackend>) -> Self {
        Self { session, api }
    }

    /// Renders `route`. `filter` is the search term for list views.
    pub async fn render(&self, route: &Route, filter: Option<&str>) -> String {
        let session = self.session.snapshot();
        let body = match route {
            Route::Home => home(&session),
            Route::Login => LOGIN_FORM.to_string(),
            Route::Signup => SIGNUP_FORM.to_string(),
            Route::Companies => self.company_list(&session, filter).await,
            Route::CompanyDetail(handle) => self.company_detail(&session, handle).await,
            Route::Jobs => self.job_list(&session, filter).await,
            Route::Profile => profile(&session),
        };
        format!("{}\n\n{}", nav_bar(&session), body)
    }

    async fn company_list(&self, session: &Session, filter: Option<&str>) -> String {
        match self
            .api
            .get_companies(session.token.as_deref(), filter)
            .await
        {
            Ok(companies) if companies.is_empty() => "Sorry, no results were found!".to_string(),
            Ok(companies) => {
                let mut out = search_hint("company name", filter);
                for c in &companies {
                    out.push_str(&company_card(c));
                }
                out
            }
            Err(e) => load_error("companies", &e),
        }
    }

    async fn company_detail(&self, session: &Session, handle: &str) -> String {
        match self.api.get_company(session.token.as_deref(), handle).await {
            Ok(detail) => {
                let mut out = format!("{}\n", detail.company.name);
                if let Some(description) = &detail.company.description {
                    out.push_str(&format!("{description}\n"));
                }
                out.push('\n');
                if detail.jobs.is_empty() {
                    out.push_str("No open positions.\n");
                }
                for job in &detail.jobs {
                    out.push_str(&job_card(job, self.session.has_applied(job.id)));
                }
                out
            }
            Err(e) => load_error("company", &e),
        }
    }

    async fn job_list(&self, session: &Session, filter: Option<&str>) -> String {
        match self.api.get_jobs(session.token.as_deref(), filter).await {
            Ok(jobs) if jobs.is_empty() => "Sorry, no results were found!".to_string(),
            Ok(jobs) => {
                let mut out = search_hint("job title", filter);
                for job in &jobs {
                    out.push_str(&job_card(job, self.session.has_applied(job.id)));
                }
                out
            }
            Err(e) => load_error("jobs", &e),
        }
    }
}

const LOGIN_FORM: &str = "Log In\n  login <username> <password>";

const SIGNUP_FORM: &str = "Sign Up\n  signup <username> <password> <first name> <last name> <email>";

pub fn nav_bar(session: &Session) -> String {
    match session.username() {
        Some(username) => format!(
            "[Jobly]  Companies (/companies) | Jobs (/jobs) | Profile (/profile) | Log out {username}"
        ),
        None => "[Jobly]  Login (/login) | Sign Up (/signup)".to_string(),
    }
}

fn home(session: &Session) -> String {
    let mut out = "Jobly\nAll the jobs in one, convenient place.\n".to_string();
    match &session.current_user {
        Some(user) => out.push_str(&format!("Welcome Back, {}!", user.first_name)),
        None => out.push_str("Log in or sign up to get started."),
    }
    if let Some(err) = &session.last_error {
        out.push_str(&format!("\n(Your saved session could not be restored: {err})"));
    }
    out
}

fn profile(session: &Session) -> String {
    let Some(user) = &session.current_user else {
        return "Not logged in.".to_string();
    };
    format!(
        "Profile\n  Username:   {}\n  First name: {}\n  Last name:  {}\n  Email:      {}\n  Applied to: {} job(s)\n\nEdit with: profile firstName=.. lastName=.. email=.. password=..",
        user.username,
        user.first_name,
        user.last_name,
        user.email,
        session.applied_job_ids.len()
    )
}

fn search_hint(what: &str, filter: Option<&str>) -> String {
    match filter {
        Some(term) => format!("Results for {what} \"{term}\" (search <term> to refine)\n\n"),
        None => format!("Search by {what}: search <term>\n\n"),
    }
}

fn company_card(company: &Company) -> String {
    let mut out = format!("  {}  (/companies/{})\n", company.name, company.handle);
    if let Some(description) = &company.description {
        out.push_str(&format!("    {description}\n"));
    }
    out
}

fn job_card(job: &Job, applied: bool) -> String {
    let mut out = format!("  #{} {}\n", job.id, job.title);
    if let Some(company) = &job.company_name {
        out.push_str(&format!("    {company}\n"));
    }
    if let Some(salary) = job.salary {
        out.push_str(&format!("    Salary: {}\n", format_salary(salary)));
    }
    if let Some(equity) = &job.equity {
        out.push_str(&format!("    Equity: {equity}\n"));
    }
    if applied {
        out.push_str("    [Applied]\n");
    } else {
        out.push_str(&format!("    apply {}\n", job.id));
    }
    out
}

fn load_error(what: &str, err: &RequestError) -> String {
    warn!("Failed to load {what}: {err}");
    format!("Could not load {what}: {}", err.messages().join("; "))
}

/// Groups digits in threes: 120000 → "120,000".
fn format_salary(salary: i64) -> String {
    let digits = salary.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if salary < 0 {
        grouped.insert(0, '-');
    }
    grouped
}
