use std::{fmt, future::Future, sync::Arc, time::Duration};

use sea_orm::DatabaseConnection;

use crate::{
    EngineError, EventBus, EventPublisher, LedgerEvent, LedgerEventKind, ResultEngine,
    locks::UserLocks,
};

mod fund_shares;
mod ledger;
mod progress;
mod targets;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

pub struct Engine {
    database: DatabaseConnection,
    locks: UserLocks,
    publisher: Arc<dyn EventPublisher>,
    max_retries: u32,
    tx_timeout: Option<Duration>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .field("max_retries", &self.max_retries)
            .field("tx_timeout", &self.tx_timeout)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    fn publish(&self, kind: LedgerEventKind) {
        let event = LedgerEvent::new(kind);
        tracing::debug!(event = event.name(), "publishing ledger event");
        self.publisher.publish(event);
    }

    /// Runs one transactional attempt of `op`, retrying transient storage
    /// errors with a linear backoff.
    ///
    /// Exhausted retries and exceeded deadlines surface as
    /// [`EngineError::Conflict`]. A timed-out attempt is dropped mid-flight,
    /// which rolls its transaction back.
    async fn retrying<T, F, Fut>(&self, operation: &'static str, mut op: F) -> ResultEngine<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ResultEngine<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let result = match self.tx_timeout {
                Some(limit) => match tokio::time::timeout(limit, op()).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(operation, ?limit, "transaction deadline exceeded");
                        return Err(EngineError::Conflict(format!(
                            "{operation}: transaction deadline exceeded"
                        )));
                    }
                },
                None => op().await,
            };

            match result {
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(operation, attempt, "transient storage error, retrying: {err}");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(err) if err.is_transient() => {
                    return Err(EngineError::Conflict(format!(
                        "{operation}: concurrent write retries exhausted: {err}"
                    )));
                }
                other => return other,
            }
        }
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    publisher: Option<Arc<dyn EventPublisher>>,
    max_retries: u32,
    tx_timeout: Option<Duration>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            publisher: None,
            max_retries: DEFAULT_MAX_RETRIES,
            tx_timeout: None,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Sink for committed ledger events. Defaults to a fresh [`EventBus`]
    /// nobody listens to.
    pub fn publisher(mut self, publisher: Arc<dyn EventPublisher>) -> EngineBuilder {
        self.publisher = Some(publisher);
        self
    }

    /// Retries granted to transient storage errors before giving up.
    pub fn max_retries(mut self, max_retries: u32) -> EngineBuilder {
        self.max_retries = max_retries;
        self
    }

    /// Deadline for a single transactional attempt.
    pub fn tx_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.tx_timeout = Some(timeout);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if matches!(self.database, DatabaseConnection::Disconnected) {
            return Err(EngineError::Validation(
                "engine requires a database connection".to_string(),
            ));
        }
        Ok(Engine {
            database: self.database,
            locks: UserLocks::default(),
            publisher: self
                .publisher
                .unwrap_or_else(|| Arc::new(EventBus::default())),
            max_retries: self.max_retries,
            tx_timeout: self.tx_timeout,
        })
    }
}
