use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteName {
    Planner,
    Budget,
    Itinerary,
    Login,
    Register,
}

impl RouteName {
    pub const ALL: [RouteName; 5] = [
        RouteName::Planner,
        RouteName::Budget,
        RouteName::Itinerary,
        RouteName::Login,
        RouteName::Register,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteName::Planner => "planner",
            RouteName::Budget => "budget",
            RouteName::Itinerary => "itinerary",
            RouteName::Login => "login",
            RouteName::Register => "register",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            RouteName::Planner => "/planner",
            RouteName::Budget => "/budget",
            RouteName::Itinerary => "/itinerary",
            RouteName::Login => "/login",
            RouteName::Register => "/register",
        }
    }

    /// Name of the view component mounted for this route.
    pub fn component(&self) -> &'static str {
        match self {
            RouteName::Planner => "Planner",
            RouteName::Budget => "Budget",
            RouteName::Itinerary => "Itinerary",
            RouteName::Login => "Login",
            RouteName::Register => "Register",
        }
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteName {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RouteName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RouteError::UnknownName(s.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("no route matches {0}")]
    NotFound(String),
    #[error("unknown route name: {0}")]
    UnknownName(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub name: RouteName,
    pub path: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirected_from: Option<String>,
}

struct Redirect {
    from: &'static str,
    to: &'static str,
}

struct RouteEntry<V> {
    name: RouteName,
    path: &'static str,
    view: OnceLock<V>,
    factory: Box<dyn Fn() -> V + Send + Sync>,
}

/// Static path table. Each entry builds its view on first navigation and
/// keeps it for the lifetime of the table.
pub struct RouteTable<V> {
    redirects: Vec<Redirect>,
    entries: Vec<RouteEntry<V>>,
}

impl<V> RouteTable<V> {
    pub fn empty() -> Self {
        Self {
            redirects: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// The application table: `/` redirects to `/planner`, and every
    /// [`RouteName`] is mounted at its own path.
    pub fn standard<F>(factory: F) -> Self
    where
        F: Fn(RouteName) -> V + Send + Sync + 'static,
    {
        let factory = Arc::new(factory);
        let mut table = Self::empty().with_redirect("/", RouteName::Planner.path());
        for name in RouteName::ALL {
            let factory = Arc::clone(&factory);
            table = table.with_route(name, name.path(), move || (*factory)(name));
        }
        table
    }

    pub fn with_route<F>(mut self, name: RouteName, path: &'static str, factory: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.entries.push(RouteEntry {
            name,
            path,
            view: OnceLock::new(),
            factory: Box::new(factory),
        });
        self
    }

    pub fn with_redirect(mut self, from: &'static str, to: &'static str) -> Self {
        self.redirects.push(Redirect { from, to });
        self
    }

    pub fn routes(&self) -> impl Iterator<Item = (RouteName, &'static str)> + '_ {
        self.entries.iter().map(|entry| (entry.name, entry.path))
    }

    /// Matches ignore query string, fragment, a trailing slash and ASCII case.
    /// A matching redirect is followed once.
    pub fn resolve(&self, path: &str) -> Result<Resolution, RouteError> {
        let requested = normalize(path);
        let (target, redirected_from) = match self
            .redirects
            .iter()
            .find(|redirect| redirect.from.eq_ignore_ascii_case(&requested))
        {
            Some(redirect) => (redirect.to.to_string(), Some(requested.clone())),
            None => (requested.clone(), None),
        };

        let entry = self
            .find_by_path(&target)
            .ok_or_else(|| RouteError::NotFound(path.to_string()))?;
        debug!(
            target: "router",
            path,
            route = %entry.name,
            redirected = redirected_from.is_some(),
            "route resolved"
        );
        Ok(Resolution {
            name: entry.name,
            path: entry.path,
            redirected_from,
        })
    }

    /// Resolves `path` and returns the route's view, constructing it if this
    /// is the first navigation to that route.
    pub fn navigate(&self, path: &str) -> Result<(Resolution, &V), RouteError> {
        let resolution = self.resolve(path)?;
        let view = self.view(resolution.name)?;
        Ok((resolution, view))
    }

    pub fn view(&self, name: RouteName) -> Result<&V, RouteError> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| RouteError::UnknownName(name.to_string()))?;
        Ok(entry.view.get_or_init(|| (entry.factory)()))
    }

    pub fn is_loaded(&self, name: RouteName) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.name == name && entry.view.get().is_some())
    }

    fn find_by_path(&self, path: &str) -> Option<&RouteEntry<V>> {
        self.entries
            .iter()
            .find(|entry| entry.path.eq_ignore_ascii_case(path))
    }
}

fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default().trim();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
