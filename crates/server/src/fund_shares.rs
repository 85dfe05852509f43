//! Fund sharing endpoints and the balance read.

use api_types::fund_share::{FundShareListQuery, FundShareNew, FundShareReverse};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{Actor, FundShare, ShareFundCmd, ShareOutcome, UserBalance};
use uuid::Uuid;

use crate::{ServerError, parse_money, server::ServerState};

pub async fn share(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<FundShareNew>,
) -> Result<(StatusCode, Json<ShareOutcome>), ServerError> {
    let cmd = ShareFundCmd {
        from_user_id: payload
            .from_user_id
            .unwrap_or_else(|| actor.user_id.clone()),
        to_user_id: payload.to_user_id,
        amount: parse_money(&payload.amount)?,
        reason: payload.reason,
    };
    let outcome = state.engine.share_fund(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn reverse(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(share_id): Path<Uuid>,
    Json(payload): Json<FundShareReverse>,
) -> Result<Json<ShareOutcome>, ServerError> {
    let outcome = state
        .engine
        .reverse_fund(&actor, share_id, payload.reason.as_deref())
        .await?;
    Ok(Json(outcome))
}

pub async fn list(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
    Query(query): Query<FundShareListQuery>,
) -> Result<Json<Vec<FundShare>>, ServerError> {
    let shares = state
        .engine
        .list_fund_shares(&user_id, query.include_reversed)
        .await?;
    Ok(Json(shares))
}

pub async fn balance(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserBalance>, ServerError> {
    Ok(Json(state.engine.balance(&user_id).await?))
}
