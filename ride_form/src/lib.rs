//! Web form front-end for the ride prediction API.

pub mod client;
pub mod config;
pub mod form;
pub mod page;

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use chrono::Local;
use tower_http::trace::TraceLayer;

use crate::client::{FormError, PredictionClient};
use crate::form::RideForm;
use crate::page::{Outcome, Pages};

#[derive(Clone)]
pub struct AppState {
    pub client: PredictionClient,
    pub pages: Arc<Pages>,
}

impl IntoResponse for FormError {
    fn into_response(self) -> Response {
        tracing::error!("{}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

async fn show_form(State(state): State<AppState>) -> Result<Html<String>, FormError> {
    let now = Local::now().naive_local();
    let form = RideForm::blank(now.date(), now.time());
    Ok(Html(state.pages.render(&form, None)?))
}

async fn submit(
    State(state): State<AppState>,
    Form(form): Form<RideForm>,
) -> Result<Html<String>, FormError> {
    let outcome = match form.validate() {
        Err(e) => Outcome::Invalid {
            message: e.to_string(),
        },
        Ok(payload) => {
            tracing::debug!("requesting prediction for ride on {}", payload.date);
            match state.client.predict(&payload).await {
                Ok(status) => Outcome::Predicted { status },
                Err(e @ FormError::Api { .. }) => Outcome::ApiError {
                    message: e.to_string(),
                },
                Err(e) => Outcome::Unreachable {
                    message: e.to_string(),
                },
            }
        }
    };
    Ok(Html(state.pages.render(&form, Some(&outcome))?))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(show_form).post(submit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        "form listening on {} (api {})",
        listener.local_addr()?,
        state.client.api_url()
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}
