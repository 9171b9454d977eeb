//! Router/Gate.
//!
//! Two states decide what is reachable. Signed out, only `/login` renders and every
//! other path redirects to it. Signed in, the layout at `/` and its three children
//! render and `/login` (or any unknown path) redirects to `/`.

use crate::session::SessionState;
use std::fmt::{Display, Formatter, Result as FmtResult};

pub const LOGIN_PATH: &str = "/login";
pub const ROOT_PATH: &str = "/";

/// A view that can be mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    /// Index child of the authenticated layout: the upload view.
    Home,
    Public,
    Private,
}

impl Route {
    pub const AUTHENTICATED: [Route; 3] = [Route::Home, Route::Public, Route::Private];

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => LOGIN_PATH,
            Route::Home => ROOT_PATH,
            Route::Public => "/public",
            Route::Private => "/private",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        match normalize(path).as_str() {
            "/login" => Some(Route::Login),
            "/" => Some(Route::Home),
            "/public" => Some(Route::Public),
            "/private" => Some(Route::Private),
            _ => None,
        }
    }

    pub fn requires_session(self) -> bool {
        !matches!(self, Route::Login)
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.path())
    }
}

fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        ROOT_PATH.to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Outcome of resolving a path against the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Session not fetched yet; nothing renders.
    Loading,
    Render(Route),
    Redirect(&'static str),
}

/// Resolve `path` for the given session state.
pub fn resolve(state: &SessionState, path: &str) -> Resolution {
    if !state.is_resolved() {
        return Resolution::Loading;
    }

    let route = Route::from_path(path);
    if state.is_authenticated() {
        match route {
            Some(route) if route.requires_session() => Resolution::Render(route),
            _ => Resolution::Redirect(ROOT_PATH),
        }
    } else {
        match route {
            Some(Route::Login) => Resolution::Render(Route::Login),
            _ => Resolution::Redirect(LOGIN_PATH),
        }
    }
}

/// Every route that renders without a redirect in this state.
pub fn reachable(state: &SessionState) -> Vec<Route> {
    match state {
        SessionState::Pending => Vec::new(),
        SessionState::Resolved(Some(_)) => Route::AUTHENTICATED.to_vec(),
        SessionState::Resolved(None) => vec![Route::Login],
    }
}

/// Current location plus the view mounted there.
#[derive(Debug, Clone)]
pub struct Navigator {
    location: String,
    mounted: Option<Route>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            location: ROOT_PATH.to_string(),
            mounted: None,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn mounted(&self) -> Option<Route> {
        self.mounted
    }

    /// Go to `path`, following a redirect if the gate issues one.
    pub fn navigate(&mut self, state: &SessionState, path: &str) -> Option<Route> {
        self.location = normalize(path);
        self.settle(state)
    }

    /// Re-resolve the current location after the session was replaced. A mounted view
    /// that is no longer reachable is redirected away.
    pub fn on_session_change(&mut self, state: &SessionState) -> Option<Route> {
        self.settle(state)
    }

    fn settle(&mut self, state: &SessionState) -> Option<Route> {
        // The gate redirects at most once: both redirect targets render in their state.
        for _ in 0..2 {
            match resolve(state, &self.location) {
                Resolution::Loading => {
                    self.mounted = None;
                    return None;
                }
                Resolution::Render(route) => {
                    if self.mounted != Some(route) {
                        tracing::debug!(route = %route, "Mounting view");
                    }
                    self.mounted = Some(route);
                    return Some(route);
                }
                Resolution::Redirect(target) => {
                    tracing::debug!(from = %self.location, to = target, "Redirecting");
                    self.location = target.to_string();
                }
            }
        }
        self.mounted = None;
        None
    }
}
