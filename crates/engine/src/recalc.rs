//! Consistency recalculator.
//!
//! Pure functions deriving a target's balance from the canonical ledger rows.
//! Nothing here is cached or stored: every mutation and every read calls
//! [`recompute`] on freshly loaded rows.
//!
//! ```text
//! total_progress     = Σ approved progress of the target
//! shared_in          = Σ active shares received by the owner
//! shared_out         = Σ active shares sent by the owner
//! net_amount         = total_progress + shared_in - shared_out
//! progress_pct       = target_amount > 0 ? net_amount / target_amount * 100 : 0
//! remaining          = max(0, target_amount - net_amount)
//! available_to_share = max(0, net_amount - shared_out)
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{FundShare, Money, Percent, ProgressEntry, ProgressStatus, Target};

/// Raw sums read from the ledger for one user and (optionally) one target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub total_progress: Money,
    pub shared_in: Money,
    pub shared_out: Money,
}

impl LedgerTotals {
    /// Sums the rows that count toward `user_id`'s balance. Progress is only
    /// counted when it belongs to `target_id`; a user without a target has
    /// no progress but still has shares.
    pub fn from_rows(
        user_id: &str,
        target_id: Option<Uuid>,
        progress: &[ProgressEntry],
        shares: &[FundShare],
    ) -> Self {
        let total_progress = target_id
            .map(|target_id| {
                progress
                    .iter()
                    .filter(|entry| {
                        entry.target_id == target_id && entry.status == ProgressStatus::Approved
                    })
                    .map(|entry| entry.amount)
                    .sum::<Money>()
            })
            .unwrap_or(Money::ZERO);

        let active = || shares.iter().filter(|share| share.is_active());
        let shared_in: Money = active()
            .filter(|share| share.to_user_id == user_id)
            .map(|share| share.amount)
            .sum();
        let shared_out: Money = active()
            .filter(|share| share.from_user_id == user_id)
            .map(|share| share.amount)
            .sum();

        Self {
            total_progress,
            shared_in,
            shared_out,
        }
    }
}

/// The derived, never-stored balance of a target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedView {
    pub target_amount: Money,
    pub total_progress: Money,
    pub shared_in: Money,
    pub shared_out: Money,
    pub net_amount: Money,
    pub progress_percentage: Percent,
    pub remaining_amount: Money,
    pub available_to_share: Money,
}

impl DerivedView {
    /// Whether the target has been reached (progress may exceed 100).
    pub fn is_reached(&self) -> bool {
        self.progress_percentage >= Percent::HUNDRED
    }
}

/// Applies the balance formulas to already-summed totals.
pub fn derive(target_amount: Money, totals: LedgerTotals) -> DerivedView {
    let LedgerTotals {
        total_progress,
        shared_in,
        shared_out,
    } = totals;
    let net_amount = total_progress + shared_in - shared_out;

    DerivedView {
        target_amount,
        total_progress,
        shared_in,
        shared_out,
        net_amount,
        progress_percentage: Percent::ratio(net_amount, target_amount),
        remaining_amount: (target_amount - net_amount).clamp_non_negative(),
        available_to_share: (net_amount - shared_out).clamp_non_negative(),
    }
}

/// Recomputes `target`'s view from the ledger rows.
pub fn recompute(target: &Target, progress: &[ProgressEntry], shares: &[FundShare]) -> DerivedView {
    let totals = LedgerTotals::from_rows(&target.user_id, Some(target.id), progress, shares);
    derive(target.target_amount, totals)
}
