use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Landing,
    Vote,
    Results,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Landing, Route::Vote, Route::Results];

    pub fn path(self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Vote => "/votar",
            Route::Results => "/resultados",
        }
    }

    /// Client-side dispatch; a trailing slash and a query string are ignored.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.split(|c: char| c == '?' || c == '#').next().unwrap_or("");
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Route::ALL.into_iter().find(|r| r.path() == normalized)
    }
}

/// Link encoded in the landing page's QR code.
pub fn share_link(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), Route::Vote.path())
}
