//! Domain events emitted after each committed mutation.
//!
//! The engine hands every [`LedgerEvent`] to an [`EventPublisher`]; fanning it
//! out to connected clients is the publisher's concern. [`EventBus`] is the
//! default in-process publisher backed by a `tokio::sync::broadcast` channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    DerivedView, FundShare, Money, Percent, ProgressEntry, ProgressStatus, ReviewDecision, Target,
};

/// Event envelope: when it happened plus the tagged payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: LedgerEventKind,
}

impl LedgerEvent {
    pub fn new(kind: LedgerEventKind) -> Self {
        Self {
            occurred_at: Utc::now(),
            kind,
        }
    }

    /// Wire name of the event, e.g. `"fund_shared"`.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEventKind {
    TargetCreated {
        target: Target,
        view: DerivedView,
    },
    /// `target` is `None` when the update is a deletion.
    TargetUpdated {
        target_id: Uuid,
        target: Option<Target>,
        view: Option<DerivedView>,
    },
    TargetDeleted {
        target_id: Uuid,
        user_id: String,
    },
    TargetProgressCreated {
        entry: ProgressEntry,
    },
    TargetProgressUpdated {
        target_id: Uuid,
        progress_id: Uuid,
        action: ReviewDecision,
        status: ProgressStatus,
        total_progress: Money,
        net_amount: Money,
        progress_percentage: Percent,
        remaining_amount: Money,
    },
    FundShared {
        fund_share_id: Uuid,
        from_user_id: String,
        to_user_id: String,
        amount: Money,
    },
    FundReversed {
        fund_share_id: Uuid,
        from_user_id: String,
        to_user_id: String,
        amount: Money,
    },
}

impl LedgerEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TargetCreated { .. } => "target_created",
            Self::TargetUpdated { .. } => "target_updated",
            Self::TargetDeleted { .. } => "target_deleted",
            Self::TargetProgressCreated { .. } => "target_progress_created",
            Self::TargetProgressUpdated { .. } => "target_progress_updated",
            Self::FundShared { .. } => "fund_shared",
            Self::FundReversed { .. } => "fund_reversed",
        }
    }

    pub(crate) fn progress_updated(
        entry: &ProgressEntry,
        action: ReviewDecision,
        view: &DerivedView,
    ) -> Self {
        Self::TargetProgressUpdated {
            target_id: entry.target_id,
            progress_id: entry.id,
            action,
            status: entry.status,
            total_progress: view.total_progress,
            net_amount: view.net_amount,
            progress_percentage: view.progress_percentage,
            remaining_amount: view.remaining_amount,
        }
    }

    pub(crate) fn fund_shared(share: &FundShare) -> Self {
        Self::FundShared {
            fund_share_id: share.id,
            from_user_id: share.from_user_id.clone(),
            to_user_id: share.to_user_id.clone(),
            amount: share.amount,
        }
    }

    pub(crate) fn fund_reversed(share: &FundShare) -> Self {
        Self::FundReversed {
            fund_share_id: share.id,
            from_user_id: share.from_user_id.clone(),
            to_user_id: share.to_user_id.clone(),
            amount: share.amount,
        }
    }
}

/// Sink for committed ledger events.
///
/// Implementations must not block: `publish` is called on the request path
/// right after commit.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: LedgerEvent);
}

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Any number of subscribers independently receive every published event.
/// Slow receivers observe `RecvError::Lagged` once the buffer overflows.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LedgerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: LedgerEvent) {
        // A send error only means there are no receivers right now.
        if self.sender.send(event).is_err() {
            tracing::trace!("ledger event dropped: no subscribers");
        }
    }
}
