//! Progress ledger endpoints.

use api_types::progress::{ProgressNew, ProgressReview, ReportProgressNew, ReviewDecision as WireDecision};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{
    Actor, ProgressEntry, ProgressOutcome, ReportProgressCmd, ReviewDecision, SubmitProgressCmd,
};
use uuid::Uuid;

use crate::{ServerError, parse_money, server::ServerState};

pub async fn submit(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(target_id): Path<Uuid>,
    Json(payload): Json<ProgressNew>,
) -> Result<(StatusCode, Json<ProgressEntry>), ServerError> {
    let cmd = SubmitProgressCmd {
        target_id,
        amount: parse_money(&payload.amount)?,
        category: payload.category,
        transaction_date: payload.transaction_date,
        source_user_id: payload
            .source_user_id
            .unwrap_or_else(|| actor.user_id.clone()),
    };
    let entry = state.engine.submit_progress(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(target_id): Path<Uuid>,
) -> Result<Json<Vec<ProgressEntry>>, ServerError> {
    Ok(Json(state.engine.list_progress(target_id).await?))
}

pub async fn review(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(progress_id): Path<Uuid>,
    Json(payload): Json<ProgressReview>,
) -> Result<Json<ProgressOutcome>, ServerError> {
    let decision = match payload.decision {
        WireDecision::Approved => ReviewDecision::Approved,
        WireDecision::Rejected => ReviewDecision::Rejected,
    };
    let outcome = state
        .engine
        .review_progress(&actor, progress_id, decision)
        .await?;
    Ok(Json(outcome))
}

pub async fn report(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
    Json(payload): Json<ReportProgressNew>,
) -> Result<(StatusCode, Json<ProgressOutcome>), ServerError> {
    let cmd = ReportProgressCmd {
        user_id,
        amount: parse_money(&payload.amount)?,
        category: payload.category,
        transaction_date: payload.transaction_date,
        source_user_id: payload
            .source_user_id
            .unwrap_or_else(|| actor.user_id.clone()),
    };
    let outcome = state.engine.record_report_progress(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
