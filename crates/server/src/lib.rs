use api_types::error::ErrorBody;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::{EngineError, Money};

pub use server::{router, run, run_with_listener, spawn_with_listener};

mod fund_shares;
mod progress;
mod server;
mod targets;

pub mod types {
    pub mod target {
        pub use api_types::target::{TargetExtend, TargetNew, TargetStatus, TargetUpdate};
        pub use engine::{Target, TargetView};
    }

    pub mod progress {
        pub use api_types::progress::{ProgressNew, ProgressReview, ReportProgressNew, ReviewDecision};
        pub use engine::{ProgressEntry, ProgressOutcome};
    }

    pub mod fund_share {
        pub use api_types::fund_share::{FundShareListQuery, FundShareNew, FundShareReverse};
        pub use engine::{FundShare, ShareOutcome, UserBalance};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Conflict(_) | EngineError::State(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::Validation(_) | EngineError::InsufficientBalance { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

fn body_for_engine_error(err: EngineError) -> ErrorBody {
    let kind = err.kind().to_string();
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            ErrorBody {
                kind,
                error: "internal server error".to_string(),
                available: None,
                requested: None,
            }
        }
        EngineError::InsufficientBalance {
            available,
            requested,
        } => ErrorBody {
            error: err.to_string(),
            kind,
            available: Some(available.to_string()),
            requested: Some(requested.to_string()),
        },
        other => ErrorBody {
            kind,
            error: other.to_string(),
            available: None,
            requested: None,
        },
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), body_for_engine_error(err)),
            ServerError::Generic(error) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    kind: "bad_request".to_string(),
                    error,
                    available: None,
                    requested: None,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

/// Parses a decimal amount from a request body; failures are 422s.
fn parse_money(value: &str) -> Result<Money, ServerError> {
    Ok(value.parse::<Money>()?)
}
