//! Axum REST API handlers — the operation surface of the escrow core.
//!
//! Mutating handlers take the writer half of the engine lock, run the
//! operation to completion, and record the emitted events before the
//! lock is released, reproducing the one-mutation-at-a-time execution
//! model. Read handlers take the reader half and observe only fully
//! committed state.
//!
//! Caller identity arrives in the request body; authentication and
//! signing are external collaborators.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use escrow_engine::types::{AccountId, Certificate, Milestone, Project};
use escrow_engine::EscrowEngine;

use crate::db;
use crate::errors::Result;
use crate::records::EventRecord;
use crate::recorder;

pub struct ApiState {
    pub engine: RwLock<EscrowEngine>,
    pub pool: SqlitePool,
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub caller: AccountId,
    pub recipient: AccountId,
    pub milestone_amounts: Vec<i128>,
    pub milestone_descriptions: Vec<String>,
    pub name: String,
    pub description: String,
}

#[derive(Serialize)]
pub struct CreateProjectResponse {
    pub project_id: u64,
}

#[derive(Deserialize)]
pub struct ContributeRequest {
    pub caller: AccountId,
    pub amount: i128,
}

#[derive(Deserialize)]
pub struct CallerRequest {
    pub caller: AccountId,
}

#[derive(Deserialize)]
pub struct CompleteProjectRequest {
    pub caller: AccountId,
    pub impact_value: u64,
    pub image_uri: String,
}

#[derive(Serialize)]
pub struct CompleteProjectResponse {
    pub project_id: u64,
    pub certificate_id: u64,
}

#[derive(Serialize)]
pub struct ProjectCountResponse {
    pub count: u64,
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub project_id: u64,
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct AllEventsResponse {
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct CertificatesResponse {
    pub owner: AccountId,
    pub count: usize,
    pub certificates: Vec<Certificate>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// ─────────────────────────────────────────────────────────
// Mutating handlers
// ─────────────────────────────────────────────────────────

/// `POST /projects`
pub async fn create_project(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Json<CreateProjectResponse>> {
    let mut engine = state.engine.write().await;
    let project_id = engine.create_project(
        &req.caller,
        req.recipient,
        req.milestone_amounts,
        req.milestone_descriptions,
        req.name,
        req.description,
    )?;
    recorder::record_new_events(&state.pool, &engine).await?;
    Ok(Json(CreateProjectResponse { project_id }))
}

/// `POST /projects/:id/contributions`
pub async fn contribute(
    State(state): State<Arc<ApiState>>,
    Path(project_id): Path<u64>,
    Json(req): Json<ContributeRequest>,
) -> Result<Json<Project>> {
    let mut engine = state.engine.write().await;
    engine.contribute(&req.caller, project_id, req.amount)?;
    recorder::record_new_events(&state.pool, &engine).await?;
    Ok(Json(engine.get_project(project_id)?.clone()))
}

/// `POST /projects/:id/milestones/:index/verify`
pub async fn verify_milestone(
    State(state): State<Arc<ApiState>>,
    Path((project_id, index)): Path<(u64, u32)>,
    Json(req): Json<CallerRequest>,
) -> Result<Json<Milestone>> {
    let mut engine = state.engine.write().await;
    engine.verify_milestone(&req.caller, project_id, index)?;
    recorder::record_new_events(&state.pool, &engine).await?;
    Ok(Json(engine.get_milestone(project_id, index)?.clone()))
}

/// `POST /projects/:id/milestones/:index/pay`
pub async fn pay_milestone(
    State(state): State<Arc<ApiState>>,
    Path((project_id, index)): Path<(u64, u32)>,
    Json(req): Json<CallerRequest>,
) -> Result<Json<Milestone>> {
    let mut engine = state.engine.write().await;
    engine.pay_milestone(&req.caller, project_id, index)?;
    recorder::record_new_events(&state.pool, &engine).await?;
    Ok(Json(engine.get_milestone(project_id, index)?.clone()))
}

/// `POST /projects/:id/complete`
pub async fn complete_project(
    State(state): State<Arc<ApiState>>,
    Path(project_id): Path<u64>,
    Json(req): Json<CompleteProjectRequest>,
) -> Result<Json<CompleteProjectResponse>> {
    let mut engine = state.engine.write().await;
    let certificate_id =
        engine.complete_project(&req.caller, project_id, req.impact_value, req.image_uri)?;
    recorder::record_new_events(&state.pool, &engine).await?;
    Ok(Json(CompleteProjectResponse {
        project_id,
        certificate_id,
    }))
}

// ─────────────────────────────────────────────────────────
// Read handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /projects/count`
pub async fn project_count(State(state): State<Arc<ApiState>>) -> Json<ProjectCountResponse> {
    let engine = state.engine.read().await;
    Json(ProjectCountResponse {
        count: engine.project_count(),
    })
}

/// `GET /projects/:id`
pub async fn get_project(
    State(state): State<Arc<ApiState>>,
    Path(project_id): Path<u64>,
) -> Result<Json<Project>> {
    let engine = state.engine.read().await;
    Ok(Json(engine.get_project(project_id)?.clone()))
}

/// `GET /projects/:id/milestones/:index`
pub async fn get_milestone(
    State(state): State<Arc<ApiState>>,
    Path((project_id, index)): Path<(u64, u32)>,
) -> Result<Json<Milestone>> {
    let engine = state.engine.read().await;
    Ok(Json(engine.get_milestone(project_id, index)?.clone()))
}

/// `GET /certificates/:id`
pub async fn get_certificate(
    State(state): State<Arc<ApiState>>,
    Path(certificate_id): Path<u64>,
) -> Result<Json<Certificate>> {
    let engine = state.engine.read().await;
    engine
        .certificate(certificate_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| escrow_engine::Error::CertificateNotFound(certificate_id).into())
}

/// `GET /owners/:owner/certificates`
pub async fn get_certificates_of(
    State(state): State<Arc<ApiState>>,
    Path(owner): Path<String>,
) -> Json<CertificatesResponse> {
    let engine = state.engine.read().await;
    let owner = AccountId::new(owner);
    let certificates: Vec<Certificate> = engine
        .certificates_of(&owner)
        .into_iter()
        .cloned()
        .collect();
    Json(CertificatesResponse {
        count: certificates.len(),
        owner,
        certificates,
    })
}

/// `GET /projects/:id/events`
///
/// Returns the recorded audit trail for one project.
pub async fn get_project_events(
    State(state): State<Arc<ApiState>>,
    Path(project_id): Path<u64>,
) -> Result<Json<EventsResponse>> {
    let events = db::get_events_for_project(&state.pool, project_id as i64).await?;
    Ok(Json(EventsResponse {
        project_id,
        count: events.len(),
        events,
    }))
}

/// `GET /events`
///
/// Returns the full recorded audit trail.
pub async fn get_all_events(State(state): State<Arc<ApiState>>) -> Result<Json<AllEventsResponse>> {
    let events = db::get_all_events(&state.pool).await?;
    Ok(Json(AllEventsResponse {
        count: events.len(),
        events,
    }))
}
