//! Read models returned by engine operations.
//!
//! Every view is recomputed inside the transaction that produced it, so a
//! caller always sees the effect of its own mutation.

use serde::{Deserialize, Serialize};

use crate::{DerivedView, FundShare, ProgressEntry, Target};

/// A target together with its freshly recomputed balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetView {
    pub target: Target,
    pub view: DerivedView,
}

/// A user's balance on their current target.
///
/// `target` is `None` when the user owns no target; shares are still
/// reported and `view.target_amount` is zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBalance {
    pub user_id: String,
    pub target: Option<Target>,
    pub view: DerivedView,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressOutcome {
    pub entry: ProgressEntry,
    pub target: TargetView,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareOutcome {
    pub share: FundShare,
    pub sender: UserBalance,
    pub receiver: UserBalance,
}
