use std::fmt;

use crate::session::Session;

/// Every page the client can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Signup,
    Companies,
    CompanyDetail(String),
    Jobs,
    Profile,
}

/// Result of resolving a path against the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
}

impl Route {
    /// Parses a path such as `/companies/acme`. Trailing slashes are ignored.
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.trim();
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Some(Route::Home),
            ["login"] => Some(Route::Login),
            ["signup"] => Some(Route::Signup),
            ["companies"] => Some(Route::Companies),
            ["companies", handle] => Some(Route::CompanyDetail(handle.to_string())),
            ["jobs"] => Some(Route::Jobs),
            ["profile"] => Some(Route::Profile),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Signup => "/signup".to_string(),
            Route::Companies => "/companies".to_string(),
            Route::CompanyDetail(handle) => format!("/companies/{handle}"),
            Route::Jobs => "/jobs".to_string(),
            Route::Profile => "/profile".to_string(),
        }
    }

    /// Protected routes need a logged-in user.
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Route::Companies | Route::CompanyDetail(_) | Route::Jobs | Route::Profile
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Maps a path to what should be shown for this session.
/// Unknown paths go home; protected paths go to login when nobody is logged in.
pub fn resolve(path: &str, session: &Session) -> Navigation {
    match Route::parse(path) {
        None => Navigation::Redirect(Route::Home),
        Some(route) if route.is_protected() && !session.is_logged_in() => {
            Navigation::Redirect(Route::Login)
        }
        Some(route) => Navigation::Render(route),
    }
}
