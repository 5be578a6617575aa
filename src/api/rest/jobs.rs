use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::authorization::Permissions;
use crate::engine::dispatch::JobPatch;
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::job::NewJob;
use crate::models::payment::CheckoutSession;
use crate::models::view::{Audience, JobView};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", post(create_job))
        .route(
            "/jobs/:id",
            get(get_job).patch(edit_job).delete(delete_job),
        )
        .route("/jobs/:id/permissions", get(job_permissions))
        .route("/jobs/:id/payment", post(request_payment))
        .route("/jobs/:id/accept", post(accept_job))
        .route("/jobs/:id/pickup", post(confirm_pickup))
        .route("/jobs/:id/reschedule", post(reschedule_job))
        .route("/jobs/:id/resume", post(resume_job))
        .route("/jobs/:id/deliver", post(deliver_job))
        .route("/jobs/:id/rating", post(rate_job))
        .route("/users/:id/jobs", get(list_user_jobs))
}

#[derive(Deserialize)]
pub struct RescheduleRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct DeliverRequest {
    pub secret_code: String,
}

#[derive(Deserialize)]
pub struct RatingRequest {
    pub stars: u8,
}

async fn create_job(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<NewJob>,
) -> Result<(StatusCode, Json<JobView>), AppError> {
    let job = state.engine.create_job(&actor, payload).await?;
    let view = state.engine.view(&job, Audience::Owner).await;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_job(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<JobView>, AppError> {
    Ok(Json(state.engine.get_job(&actor, id).await?))
}

async fn edit_job(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<JobPatch>,
) -> Result<Json<JobView>, AppError> {
    let job = state.engine.edit_job(&actor, id, payload).await?;
    Ok(Json(state.engine.view(&job, Audience::Owner).await))
}

async fn delete_job(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<JobView>, AppError> {
    let job = state.engine.delete_job(&actor, id).await?;
    Ok(Json(state.engine.view(&job, Audience::Owner).await))
}

async fn job_permissions(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Permissions>, AppError> {
    Ok(Json(state.engine.permissions(&actor, id).await?))
}

async fn request_payment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<CheckoutSession>, AppError> {
    Ok(Json(state.engine.request_payment(&actor, id).await?))
}

async fn accept_job(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<JobView>, AppError> {
    let job = state.engine.accept_job(id, actor.id).await?;
    Ok(Json(state.engine.view(&job, Audience::Agent(actor.id)).await))
}

async fn confirm_pickup(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<JobView>, AppError> {
    let job = state.engine.confirm_pickup(id, actor.id).await?;
    Ok(Json(state.engine.view(&job, Audience::Agent(actor.id)).await))
}

async fn reschedule_job(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<RescheduleRequest>,
) -> Result<Json<JobView>, AppError> {
    let job = state.engine.reschedule(id, actor.id, payload.reason).await?;
    Ok(Json(state.engine.view(&job, Audience::Agent(actor.id)).await))
}

async fn resume_job(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<JobView>, AppError> {
    let job = state.engine.resume_job(id, actor.id).await?;
    Ok(Json(state.engine.view(&job, Audience::Agent(actor.id)).await))
}

async fn deliver_job(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeliverRequest>,
) -> Result<Json<JobView>, AppError> {
    let job = state
        .engine
        .validate_delivery(id, actor.id, payload.secret_code)
        .await?;
    Ok(Json(state.engine.view(&job, Audience::Agent(actor.id)).await))
}

async fn rate_job(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<RatingRequest>,
) -> Result<Json<JobView>, AppError> {
    let job = state.engine.rate_delivery(&actor, id, payload.stars).await?;
    Ok(Json(state.engine.view(&job, Audience::Owner).await))
}

async fn list_user_jobs(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<JobView>>, AppError> {
    Ok(Json(state.engine.list_jobs_for_user(&actor, id).await?))
}
