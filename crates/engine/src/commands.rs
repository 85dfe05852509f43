//! Command structs for engine operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists.

use chrono::NaiveDate;

use crate::{Money, TargetStatus};

/// Create a target for `user_id`.
#[derive(Clone, Debug)]
pub struct CreateTargetCmd {
    pub user_id: String,
    pub target_amount: Money,
    pub category: Option<String>,
    pub period_start: NaiveDate,
    pub period_end: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl CreateTargetCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, target_amount: Money, period_start: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            target_amount,
            category: None,
            period_start,
            period_end: None,
            notes: None,
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn period_end(mut self, period_end: NaiveDate) -> Self {
        self.period_end = Some(period_end);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Partial update of a target. `None` leaves the field untouched.
///
/// `category`, `period_end` and `notes` are double options: `Some(None)`
/// clears the field.
#[derive(Clone, Debug, Default)]
pub struct TargetPatch {
    pub target_amount: Option<Money>,
    pub category: Option<Option<String>>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<Option<NaiveDate>>,
    pub status: Option<TargetStatus>,
    pub notes: Option<Option<String>>,
}

impl TargetPatch {
    /// Whether the patch touches fields only privileged actors may edit.
    pub fn touches_privileged_fields(&self) -> bool {
        self.target_amount.is_some()
            || self.period_start.is_some()
            || self.period_end.is_some()
            || self.status.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.touches_privileged_fields() && self.category.is_none() && self.notes.is_none()
    }

    #[must_use]
    pub fn target_amount(mut self, amount: Money) -> Self {
        self.target_amount = Some(amount);
        self
    }

    #[must_use]
    pub fn category(mut self, category: Option<String>) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn period_start(mut self, period_start: NaiveDate) -> Self {
        self.period_start = Some(period_start);
        self
    }

    #[must_use]
    pub fn period_end(mut self, period_end: Option<NaiveDate>) -> Self {
        self.period_end = Some(period_end);
        self
    }

    #[must_use]
    pub fn status(mut self, status: TargetStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }
}

/// Submit a pending progress entry against a target.
#[derive(Clone, Debug)]
pub struct SubmitProgressCmd {
    pub target_id: uuid::Uuid,
    pub amount: Money,
    pub category: Option<String>,
    pub transaction_date: NaiveDate,
    pub source_user_id: String,
}

impl SubmitProgressCmd {
    #[must_use]
    pub fn new(
        target_id: uuid::Uuid,
        amount: Money,
        transaction_date: NaiveDate,
        source_user_id: impl Into<String>,
    ) -> Self {
        Self {
            target_id,
            amount,
            category: None,
            transaction_date,
            source_user_id: source_user_id.into(),
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Progress recorded by the automated report-approval hook: lands already
/// approved on the user's current open target.
#[derive(Clone, Debug)]
pub struct ReportProgressCmd {
    pub user_id: String,
    pub amount: Money,
    pub category: Option<String>,
    pub transaction_date: NaiveDate,
    pub source_user_id: String,
}

impl ReportProgressCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        amount: Money,
        transaction_date: NaiveDate,
        source_user_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            category: None,
            transaction_date,
            source_user_id: source_user_id.into(),
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Transfer earned credit from one user to another.
#[derive(Clone, Debug)]
pub struct ShareFundCmd {
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount: Money,
    pub reason: Option<String>,
}

impl ShareFundCmd {
    #[must_use]
    pub fn new(from_user_id: impl Into<String>, to_user_id: impl Into<String>, amount: Money) -> Self {
        Self {
            from_user_id: from_user_id.into(),
            to_user_id: to_user_id.into(),
            amount,
            reason: None,
        }
    }

    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
