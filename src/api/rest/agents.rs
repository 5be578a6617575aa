use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::dispatch::NewAgent;
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::actor::Actor;
use crate::models::agent::{ActiveStatus, Agent, ApprovalStatus};
use crate::models::view::{Audience, JobView};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/agents", post(register_agent))
        .route("/agents/:id", get(get_agent))
        .route("/agents/:id/jobs", get(list_agent_jobs))
        .route("/agents/:id/available-jobs", get(available_jobs))
        .route("/agents/:id/status", patch(update_agent_status))
        .route("/agents/:id/location", patch(update_agent_location))
        .route("/agents/:id/approval", patch(review_agent))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ActiveStatus,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub approval: ApprovalStatus,
}

async fn register_agent(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<NewAgent>,
) -> Result<(StatusCode, Json<Agent>), AppError> {
    let agent = state.engine.register_agent(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Agent>, AppError> {
    Ok(Json(state.engine.get_agent(id).await?))
}

async fn list_agent_jobs(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<JobView>>, AppError> {
    Ok(Json(state.engine.list_jobs_for_agent(&actor, id).await?))
}

async fn available_jobs(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<JobView>>, AppError> {
    if !actor.is_admin && actor.id != id {
        return Err(AppError::NotOwner);
    }

    let jobs = state.engine.find_available_jobs(id).await?;
    Ok(Json(state.engine.views(jobs, Audience::Agent(id)).await))
}

async fn update_agent_status(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Agent>, AppError> {
    Ok(Json(
        state
            .engine
            .set_agent_status(&actor, id, payload.status)
            .await?,
    ))
}

async fn update_agent_location(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Agent>, AppError> {
    Ok(Json(
        state
            .engine
            .update_agent_location(&actor, id, payload.location)
            .await?,
    ))
}

async fn review_agent(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<Agent>, AppError> {
    Ok(Json(
        state
            .engine
            .set_agent_approval(&actor, id, payload.approval)
            .await?,
    ))
}
