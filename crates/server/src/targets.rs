//! Target lifecycle endpoints.

use api_types::target::{TargetExtend, TargetNew, TargetStatus as WireStatus, TargetUpdate};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Actor, CreateTargetCmd, Target, TargetPatch, TargetStatus, TargetView};
use uuid::Uuid;

use crate::{ServerError, parse_money, server::ServerState};

fn engine_status(status: WireStatus) -> TargetStatus {
    match status {
        WireStatus::Active => TargetStatus::Active,
        WireStatus::Completed => TargetStatus::Completed,
        WireStatus::Extended => TargetStatus::Extended,
        WireStatus::Cancelled => TargetStatus::Cancelled,
    }
}

pub async fn create(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<TargetNew>,
) -> Result<(StatusCode, Json<TargetView>), ServerError> {
    let cmd = CreateTargetCmd {
        user_id: payload.user_id,
        target_amount: parse_money(&payload.target_amount)?,
        category: payload.category,
        period_start: payload.period_start,
        period_end: payload.period_end,
        notes: payload.notes,
    };
    let created = state.engine.create_target(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(target_id): Path<Uuid>,
) -> Result<Json<TargetView>, ServerError> {
    Ok(Json(state.engine.target(target_id).await?))
}

pub async fn update(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(target_id): Path<Uuid>,
    Json(payload): Json<TargetUpdate>,
) -> Result<Json<TargetView>, ServerError> {
    let patch = TargetPatch {
        target_amount: payload
            .target_amount
            .as_deref()
            .map(parse_money)
            .transpose()?,
        category: payload.category,
        period_start: payload.period_start,
        period_end: payload.period_end,
        status: payload.status.map(engine_status),
        notes: payload.notes,
    };
    Ok(Json(state.engine.edit_target(&actor, target_id, patch).await?))
}

pub async fn extend(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(target_id): Path<Uuid>,
    Json(payload): Json<TargetExtend>,
) -> Result<Json<TargetView>, ServerError> {
    let additional = parse_money(&payload.additional_amount)?;
    let extended = state
        .engine
        .extend_target(&actor, target_id, additional, payload.new_period_end)
        .await?;
    Ok(Json(extended))
}

pub async fn delete(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(target_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_target(&actor, target_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn current(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
) -> Result<Json<TargetView>, ServerError> {
    state
        .engine
        .current_target(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::Engine(engine::EngineError::NotFound("target".to_string())))
}

pub async fn list(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Target>>, ServerError> {
    Ok(Json(state.engine.list_targets(&user_id).await?))
}
