//! Progress ledger lines.
//!
//! A [`ProgressEntry`] is a contribution toward a target. Only `Approved`
//! entries count toward `total_progress`; decided entries are immutable.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProgressStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl TryFrom<&str> for ProgressStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::Validation(format!(
                "invalid progress status: {other}"
            ))),
        }
    }
}

/// A reviewer's verdict on a pending entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for ProgressStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => Self::Approved,
            ReviewDecision::Rejected => Self::Rejected,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub id: Uuid,
    pub target_id: Uuid,
    pub amount: Money,
    pub category: Option<String>,
    pub transaction_date: NaiveDate,
    pub status: ProgressStatus,
    pub source_user_id: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "progress_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub target_id: String,
    pub amount_minor: i64,
    pub category: Option<String>,
    pub transaction_date: Date,
    pub status: String,
    pub source_user_id: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::targets::Entity",
        from = "Column::TargetId",
        to = "super::targets::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Targets,
}

impl Related<super::targets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Targets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ProgressEntry> for ActiveModel {
    fn from(entry: &ProgressEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            target_id: ActiveValue::Set(entry.target_id.to_string()),
            amount_minor: ActiveValue::Set(entry.amount.cents()),
            category: ActiveValue::Set(entry.category.clone()),
            transaction_date: ActiveValue::Set(entry.transaction_date),
            status: ActiveValue::Set(entry.status.as_str().to_string()),
            source_user_id: ActiveValue::Set(entry.source_user_id.clone()),
            approved_by: ActiveValue::Set(entry.approved_by.clone()),
            approved_at: ActiveValue::Set(entry.approved_at),
            created_at: ActiveValue::Set(entry.created_at),
        }
    }
}

impl TryFrom<Model> for ProgressEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "progress entry")?,
            target_id: parse_uuid(&model.target_id, "target")?,
            amount: Money::new(model.amount_minor),
            category: model.category,
            transaction_date: model.transaction_date,
            status: ProgressStatus::try_from(model.status.as_str())?,
            source_user_id: model.source_user_id,
            approved_by: model.approved_by,
            approved_at: model.approved_at,
            created_at: model.created_at,
        })
    }
}
