//! Wire types of the ledger HTTP API.
//!
//! Monetary amounts travel as decimal strings with at most two fractional
//! digits (`"150.00"`, `"150"`, `"150,5"`); the server parses them into exact
//! minor units. Responses carry amounts formatted with exactly two digits.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) so patches can clear optional columns.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub mod headers {
    /// Caller's user id, as asserted by the upstream identity layer.
    pub const USER_ID: &str = "x-user-id";
    /// Caller's role: `admin` or `employee`.
    pub const USER_ROLE: &str = "x-user-role";
}

pub mod target {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TargetStatus {
        Active,
        Completed,
        Extended,
        Cancelled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TargetNew {
        pub user_id: String,
        pub target_amount: String,
        pub category: Option<String>,
        pub period_start: NaiveDate,
        pub period_end: Option<NaiveDate>,
        pub notes: Option<String>,
    }

    /// Partial update. `null` clears `category`, `period_end` and `notes`;
    /// omitted fields are left untouched.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TargetUpdate {
        pub target_amount: Option<String>,
        #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
        pub category: Option<Option<String>>,
        pub period_start: Option<NaiveDate>,
        #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
        pub period_end: Option<Option<NaiveDate>>,
        pub status: Option<TargetStatus>,
        #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
        pub notes: Option<Option<String>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TargetExtend {
        pub additional_amount: String,
        pub new_period_end: Option<NaiveDate>,
    }
}

pub mod progress {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ReviewDecision {
        Approved,
        Rejected,
    }

    /// Manual progress submission. `source_user_id` defaults to the caller.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProgressNew {
        pub amount: String,
        pub category: Option<String>,
        pub transaction_date: NaiveDate,
        pub source_user_id: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProgressReview {
        pub decision: ReviewDecision,
    }

    /// Progress coming from an approved report; recorded already approved.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReportProgressNew {
        pub amount: String,
        pub category: Option<String>,
        pub transaction_date: NaiveDate,
        pub source_user_id: Option<String>,
    }
}

pub mod fund_share {
    use super::*;

    /// `from_user_id` defaults to the caller.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct FundShareNew {
        pub from_user_id: Option<String>,
        pub to_user_id: String,
        pub amount: String,
        pub reason: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct FundShareReverse {
        pub reason: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct FundShareListQuery {
        #[serde(default)]
        pub include_reversed: bool,
    }
}

pub mod error {
    use super::*;

    /// Body of every non-2xx response.
    ///
    /// `available`/`requested` are only set for `insufficient_balance`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ErrorBody {
        pub kind: String,
        pub error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub available: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub requested: Option<String>,
    }
}

#[cfg(test)]
mod tests {
    use super::target::TargetUpdate;

    #[test]
    fn patch_distinguishes_null_from_missing() {
        let patch: TargetUpdate = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(patch.notes, Some(None));
        assert_eq!(patch.category, None);

        let patch: TargetUpdate =
            serde_json::from_str(r#"{"category": "Upsell", "period_end": "2024-06-30"}"#).unwrap();
        assert_eq!(patch.category, Some(Some("Upsell".to_string())));
        assert!(matches!(patch.period_end, Some(Some(_))));
    }
}
