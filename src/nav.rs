//! Client route table: guard redirects and nav bar visibility are decided from
//! the matched route, never from raw path string checks.

use axum::{routing::get, Router};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::extract::{Json, Query};
use crate::journey::JOURNEY_WEEKS;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Journey,
    Profile,
    Goals,
    Diary,
    Help,
    Week(i32),
    NotFound,
}

impl Route {
    pub fn parse(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Journey,
            ["login"] => Route::Login,
            ["profile"] => Route::Profile,
            ["goals"] => Route::Goals,
            ["diary"] => Route::Diary,
            ["help"] => Route::Help,
            ["week", n] => match n.parse::<i32>() {
                Ok(n) if (1..=JOURNEY_WEEKS).contains(&n) => Route::Week(n),
                _ => Route::NotFound,
            },
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".into(),
            Route::Journey | Route::NotFound => "/".into(),
            Route::Profile => "/profile".into(),
            Route::Goals => "/goals".into(),
            Route::Diary => "/diary".into(),
            Route::Help => "/help".into(),
            Route::Week(n) => format!("/week/{n}"),
        }
    }

    /// Where the visitor must be sent instead, if anywhere.
    pub fn redirect(&self, authenticated: bool) -> Option<Route> {
        match (self, authenticated) {
            (Route::Login, false) => None,
            (_, false) => Some(Route::Login),
            (Route::Login, true) | (Route::NotFound, true) => Some(Route::Journey),
            _ => None,
        }
    }

    pub fn shows_nav(&self) -> bool {
        !matches!(self, Route::Login | Route::Week(_))
    }
}

#[derive(Debug, Serialize)]
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
    pub active: bool,
}

const NAV: [(&str, &str, Route); 5] = [
    ("Journey", "/", Route::Journey),
    ("Goals", "/goals", Route::Goals),
    ("Diary", "/diary", Route::Diary),
    ("Profile", "/profile", Route::Profile),
    ("Help", "/help", Route::Help),
];

pub fn nav_items(current: Route) -> Vec<NavItem> {
    NAV.iter()
        .map(|&(label, path, route)| NavItem {
            label,
            path,
            active: route == current,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct NavQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct NavView {
    pub path: String,
    pub redirect: Option<String>,
    pub show_nav: bool,
    pub items: Vec<NavItem>,
}

/// Resolves a client path for the current visitor.
pub fn resolve(path: &str, authenticated: bool) -> NavView {
    let requested = Route::parse(path);
    let redirect = requested.redirect(authenticated);
    let landed = redirect.unwrap_or(requested);
    NavView {
        path: landed.path(),
        redirect: redirect.map(|r| r.path()),
        show_nav: landed.shows_nav(),
        items: if landed.shows_nav() {
            nav_items(landed)
        } else {
            Vec::new()
        },
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/nav", get(nav))
}

pub async fn nav(auth: Option<AuthUser>, Query(q): Query<NavQuery>) -> Json<NavView> {
    Json(resolve(&q.path, auth.is_some()))
}
