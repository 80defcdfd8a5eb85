//! Application endpoints.

pub mod slow;

use axum::{extract::State, response::Html};

use crate::app_state::AppState;

pub const WELCOME_MESSAGE: &str = "Welcome to my Express server!";

/// `GET /`. Served as `text/html; charset=utf-8`, byte-identical to the
/// service this replaces.
pub async fn root(State(state): State<AppState>) -> Html<&'static str> {
    state.sink().info("/");
    Html(WELCOME_MESSAGE)
}
