//! Peer-to-peer credit transfers.
//!
//! A [`FundShare`] moves earned credit from one user to another. Shares are
//! keyed by user, not by target, so they survive target deletion. Reversal is
//! one-way and keeps the row for audit.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundShareStatus {
    Active,
    Reversed,
}

impl FundShareStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Reversed => "reversed",
        }
    }
}

impl TryFrom<&str> for FundShareStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "reversed" => Ok(Self::Reversed),
            other => Err(EngineError::Validation(format!(
                "invalid fund share status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundShare {
    pub id: Uuid,
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount: Money,
    pub reason: Option<String>,
    pub status: FundShareStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub reversed_at: Option<DateTime<Utc>>,
    pub reversed_by: Option<String>,
    pub reversal_reason: Option<String>,
}

impl FundShare {
    pub fn is_active(&self) -> bool {
        self.status == FundShareStatus::Active
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fund_shares")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount_minor: i64,
    pub reason: Option<String>,
    pub status: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub reversed_at: Option<DateTimeUtc>,
    pub reversed_by: Option<String>,
    pub reversal_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&FundShare> for ActiveModel {
    fn from(share: &FundShare) -> Self {
        Self {
            id: ActiveValue::Set(share.id.to_string()),
            from_user_id: ActiveValue::Set(share.from_user_id.clone()),
            to_user_id: ActiveValue::Set(share.to_user_id.clone()),
            amount_minor: ActiveValue::Set(share.amount.cents()),
            reason: ActiveValue::Set(share.reason.clone()),
            status: ActiveValue::Set(share.status.as_str().to_string()),
            created_by: ActiveValue::Set(share.created_by.clone()),
            created_at: ActiveValue::Set(share.created_at),
            reversed_at: ActiveValue::Set(share.reversed_at),
            reversed_by: ActiveValue::Set(share.reversed_by.clone()),
            reversal_reason: ActiveValue::Set(share.reversal_reason.clone()),
        }
    }
}

impl TryFrom<Model> for FundShare {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "fund share")?,
            from_user_id: model.from_user_id,
            to_user_id: model.to_user_id,
            amount: Money::new(model.amount_minor),
            reason: model.reason,
            status: FundShareStatus::try_from(model.status.as_str())?,
            created_by: model.created_by,
            created_at: model.created_at,
            reversed_at: model.reversed_at,
            reversed_by: model.reversed_by,
            reversal_reason: model.reversal_reason,
        })
    }
}
