// src/api.rs
//! Thin HTTP surface over the trigger controller and the inbox review.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::warn;
use uuid::Uuid;

use crate::geocode::{GeocodeError, Geocoder};
use crate::inbox::{InboxReview, ReviewError};
use crate::ingest::trigger::{ScrapeTrigger, TriggerAck, TriggerRejection, TriggerStatus};
use crate::models::{Hackathon, InboxItem, ReviewStatus};
use crate::store::HackathonStore;
use crate::submission::{submit_hackathon, FormError, HackathonForm, SubmitError};

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn HackathonStore>,
    pub review: InboxReview,
    pub trigger: Arc<ScrapeTrigger>,
    pub geocoder: Option<Arc<dyn Geocoder>>,
    admin_api_key: Arc<str>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn HackathonStore>,
        trigger: Arc<ScrapeTrigger>,
        geocoder: Option<Arc<dyn Geocoder>>,
        admin_api_key: &str,
    ) -> Self {
        Self {
            review: InboxReview::new(store.clone()),
            store,
            trigger,
            geocoder,
            admin_api_key: Arc::from(admin_api_key),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/scraping/start", post(start_scrape))
        .route("/scraping/status", get(scrape_status))
        .route("/inbox", get(list_inbox))
        .route("/inbox/{id}", get(get_inbox))
        .route("/inbox/{id}/approve", post(approve_inbox))
        .route("/inbox/{id}/reject", post(reject_inbox))
        .route("/hackathons", post(submit))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(admin)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid API key")]
    Forbidden,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Trigger(#[from] TriggerRejection),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Trigger(TriggerRejection::Conflict) => StatusCode::CONFLICT,
            ApiError::Trigger(TriggerRejection::RateLimited { .. }) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Review(ReviewError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Review(ReviewError::NotPending { .. }) => StatusCode::CONFLICT,
            ApiError::Review(ReviewError::InvalidSubmission(_)) => StatusCode::BAD_REQUEST,
            ApiError::Review(ReviewError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Form(FormError::Geocode(GeocodeError::Service(_))) => StatusCode::BAD_GATEWAY,
            ApiError::Form(_) => StatusCode::BAD_REQUEST,
            ApiError::Submit(SubmitError::Invalid(_)) => StatusCode::BAD_REQUEST,
            ApiError::Submit(SubmitError::Duplicate(_)) => StatusCode::CONFLICT,
            ApiError::Submit(SubmitError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(target: "api", error = %self, "request failed");
        }
        match self {
            ApiError::Trigger(rejection) => {
                let mut resp = (status, Json(&rejection)).into_response();
                if let TriggerRejection::RateLimited { retry_after_secs } = rejection {
                    resp.headers_mut()
                        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                }
                resp
            }
            other => (status, Json(json!({ "detail": other.to_string() }))).into_response(),
        }
    }
}

async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ok = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|k| k == &*state.admin_api_key);
    if !ok {
        warn!(target: "api", path = %req.uri().path(), "rejected request with bad API key");
        return Err(ApiError::Forbidden);
    }
    Ok(next.run(req).await)
}

async fn start_scrape(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<TriggerAck>), ApiError> {
    let ack = state.trigger.trigger()?;
    Ok((StatusCode::ACCEPTED, Json(ack)))
}

async fn scrape_status(State(state): State<AppState>) -> Json<TriggerStatus> {
    Json(state.trigger.status())
}

#[derive(serde::Deserialize)]
struct InboxQuery {
    #[serde(default)]
    status: Option<String>,
}

async fn list_inbox(
    State(state): State<AppState>,
    Query(q): Query<InboxQuery>,
) -> Result<Json<Vec<InboxItem>>, ApiError> {
    let status = match q.status.as_deref() {
        None | Some("") | Some("all") => None,
        Some(s) => Some(
            ReviewStatus::parse(s)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown status '{s}'")))?,
        ),
    };
    Ok(Json(state.review.list(status).await?))
}

async fn get_inbox(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InboxItem>, ApiError> {
    Ok(Json(state.review.get(id).await?))
}

async fn approve_inbox(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<HackathonForm>,
) -> Result<(StatusCode, Json<Hackathon>), ApiError> {
    let new = form.into_new_hackathon(state.geocoder.as_deref()).await?;
    let record = state.review.approve(id, new).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn reject_inbox(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InboxItem>, ApiError> {
    Ok(Json(state.review.reject(id).await?))
}

async fn submit(
    State(state): State<AppState>,
    Json(form): Json<HackathonForm>,
) -> Result<(StatusCode, Json<Hackathon>), ApiError> {
    let new = form.into_new_hackathon(state.geocoder.as_deref()).await?;
    let record = submit_hackathon(state.store.as_ref(), new).await?;
    Ok((StatusCode::CREATED, Json(record)))
}
