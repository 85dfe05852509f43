//! Performance targets.
//!
//! A [`Target`] is a user's monetary goal for a period. Derived balances are
//! never stored on the row; see [`crate::recalc`].

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Active,
    Completed,
    Extended,
    Cancelled,
}

impl TargetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Extended => "extended",
            Self::Cancelled => "cancelled",
        }
    }

    /// Active and Extended targets are "open": they receive progress and are
    /// the user's current target.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Active | Self::Extended)
    }

    /// Allowed explicit transitions (setting the same status is a no-op).
    ///
    /// ```text
    /// Active   -> Completed | Extended | Cancelled
    /// Extended -> Active | Completed | Cancelled
    /// ```
    pub fn can_transition_to(self, next: TargetStatus) -> bool {
        if self == next {
            return true;
        }
        match self {
            Self::Active => matches!(next, Self::Completed | Self::Extended | Self::Cancelled),
            Self::Extended => matches!(next, Self::Active | Self::Completed | Self::Cancelled),
            Self::Completed | Self::Cancelled => false,
        }
    }
}

impl TryFrom<&str> for TargetStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "extended" => Ok(Self::Extended),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::Validation(format!(
                "invalid target status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: Uuid,
    pub user_id: String,
    pub target_amount: Money,
    pub category: Option<String>,
    pub period_start: NaiveDate,
    pub period_end: Option<NaiveDate>,
    pub status: TargetStatus,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "targets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub target_amount_minor: i64,
    pub category: Option<String>,
    pub period_start: Date,
    pub period_end: Option<Date>,
    pub status: String,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::progress_entries::Entity")]
    ProgressEntries,
}

impl Related<super::progress_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProgressEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Target> for ActiveModel {
    fn from(target: &Target) -> Self {
        Self {
            id: ActiveValue::Set(target.id.to_string()),
            user_id: ActiveValue::Set(target.user_id.clone()),
            target_amount_minor: ActiveValue::Set(target.target_amount.cents()),
            category: ActiveValue::Set(target.category.clone()),
            period_start: ActiveValue::Set(target.period_start),
            period_end: ActiveValue::Set(target.period_end),
            status: ActiveValue::Set(target.status.as_str().to_string()),
            notes: ActiveValue::Set(target.notes.clone()),
            created_by: ActiveValue::Set(target.created_by.clone()),
            created_at: ActiveValue::Set(target.created_at),
            updated_at: ActiveValue::Set(target.updated_at),
        }
    }
}

impl TryFrom<Model> for Target {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "target")?,
            user_id: model.user_id,
            target_amount: Money::new(model.target_amount_minor),
            category: model.category,
            period_start: model.period_start,
            period_end: model.period_end,
            status: TargetStatus::try_from(model.status.as_str())?,
            notes: model.notes,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_do_not_transition() {
        assert!(!TargetStatus::Completed.can_transition_to(TargetStatus::Active));
        assert!(!TargetStatus::Cancelled.can_transition_to(TargetStatus::Extended));
        assert!(TargetStatus::Cancelled.can_transition_to(TargetStatus::Cancelled));
    }

    #[test]
    fn extended_can_reopen() {
        assert!(TargetStatus::Extended.can_transition_to(TargetStatus::Active));
        assert!(TargetStatus::Active.can_transition_to(TargetStatus::Cancelled));
        assert!(TargetStatus::Extended.is_open());
        assert!(!TargetStatus::Completed.is_open());
    }

    #[test]
    fn status_round_trips_through_storage_string() {
        for status in [
            TargetStatus::Active,
            TargetStatus::Completed,
            TargetStatus::Extended,
            TargetStatus::Cancelled,
        ] {
            assert_eq!(TargetStatus::try_from(status.as_str()).unwrap(), status);
        }
        assert!(TargetStatus::try_from("archived").is_err());
    }
}
