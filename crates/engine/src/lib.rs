//! Target & fund ledger engine.
//!
//! Tracks per-user performance targets, the approvable progress entries that
//! feed them and peer-to-peer fund shares between users. Balances are never
//! stored: every read and every mutation recomputes them from the ledger rows
//! (see [`recompute`]).

pub use actor::{Actor, ActorRole};
pub use commands::{CreateTargetCmd, ReportProgressCmd, ShareFundCmd, SubmitProgressCmd, TargetPatch};
pub use error::EngineError;
pub use events::{DEFAULT_EVENT_CAPACITY, EventBus, EventPublisher, LedgerEvent, LedgerEventKind};
pub use fund_shares::{FundShare, FundShareStatus};
pub use money::{Money, Percent};
pub use ops::{DEFAULT_MAX_RETRIES, Engine, EngineBuilder};
pub use progress_entries::{ProgressEntry, ProgressStatus, ReviewDecision};
pub use recalc::{DerivedView, LedgerTotals, derive, recompute};
pub use targets::{Target, TargetStatus};
pub use views::{ProgressOutcome, ShareOutcome, TargetView, UserBalance};

mod actor;
mod commands;
mod error;
mod events;
mod fund_shares;
mod locks;
mod money;
mod ops;
mod progress_entries;
mod recalc;
mod targets;
mod util;
mod views;

pub type ResultEngine<T> = Result<T, EngineError>;
