use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveModelTrait, ActiveValue, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    Actor, EngineError, LedgerEventKind, ProgressEntry, ProgressOutcome, ProgressStatus,
    ReportProgressCmd, ResultEngine, ReviewDecision, SubmitProgressCmd, TargetStatus,
    progress_entries,
    util::{normalize_category, normalize_user_id, require_non_negative},
};

use super::{Engine, with_tx};

impl Engine {
    /// Submits a `Pending` entry against a target.
    ///
    /// Amounts are not checked against `target_amount`; over-achievement shows
    /// up as a percentage above 100 and a clamped `remaining_amount`.
    pub async fn submit_progress(
        &self,
        actor: &Actor,
        cmd: SubmitProgressCmd,
    ) -> ResultEngine<ProgressEntry> {
        require_non_negative(cmd.amount, "amount")?;
        let source_user_id = normalize_user_id(&cmd.source_user_id, "source_user_id")?;

        let owner = self.target_owner(cmd.target_id).await?;
        if !actor.is_privileged() && actor.user_id != owner {
            return Err(EngineError::Forbidden(
                "progress can only be submitted against your own target".to_string(),
            ));
        }
        if !actor.is_privileged() && actor.user_id != source_user_id {
            return Err(EngineError::Forbidden(
                "progress can only be attributed to yourself".to_string(),
            ));
        }

        let _guard = self.locks.lock([owner.as_str()]).await;
        let entry = self
            .retrying("submit_progress", || async {
                with_tx!(self, |db_tx| {
                    let target = self.find_target(&db_tx, cmd.target_id).await?;
                    if target.status == TargetStatus::Cancelled {
                        return Err(EngineError::State(
                            "cannot submit progress to a cancelled target".to_string(),
                        ));
                    }
                    let entry = ProgressEntry {
                        id: Uuid::new_v4(),
                        target_id: target.id,
                        amount: cmd.amount,
                        category: normalize_category(cmd.category.as_deref()),
                        transaction_date: cmd.transaction_date,
                        status: ProgressStatus::Pending,
                        source_user_id: source_user_id.clone(),
                        approved_by: None,
                        approved_at: None,
                        created_at: Utc::now(),
                    };
                    progress_entries::ActiveModel::from(&entry)
                        .insert(&db_tx)
                        .await?;
                    Ok::<_, EngineError>(entry)
                })
            })
            .await?;

        tracing::info!(
            progress_id = %entry.id,
            target_id = %entry.target_id,
            amount = %entry.amount,
            "progress submitted"
        );
        self.publish(LedgerEventKind::TargetProgressCreated {
            entry: entry.clone(),
        });
        Ok(entry)
    }

    /// Approves or rejects a pending entry and returns the owning target's
    /// recomputed view.
    ///
    /// The status write is conditional on the row still being `pending`, so a
    /// second reviewer racing on the same entry gets `State` instead of
    /// overwriting the first decision.
    pub async fn review_progress(
        &self,
        actor: &Actor,
        progress_id: Uuid,
        decision: ReviewDecision,
    ) -> ResultEngine<ProgressOutcome> {
        actor.require_privileged("reviewing progress")?;

        let entry = self.find_progress(&self.database, progress_id).await?;
        let owner = self.target_owner(entry.target_id).await?;

        let _guard = self.locks.lock([owner.as_str()]).await;
        let outcome = self
            .retrying("review_progress", || async {
                with_tx!(self, |db_tx| {
                    let entry = self.find_progress(&db_tx, progress_id).await?;
                    if entry.status != ProgressStatus::Pending {
                        return Err(EngineError::State(format!(
                            "progress entry already {}",
                            entry.status.as_str()
                        )));
                    }

                    let status = ProgressStatus::from(decision);
                    let decided = progress_entries::ActiveModel {
                        status: ActiveValue::Set(status.as_str().to_string()),
                        approved_by: ActiveValue::Set(Some(actor.user_id.clone())),
                        approved_at: ActiveValue::Set(Some(Utc::now())),
                        ..Default::default()
                    };
                    let res = progress_entries::Entity::update_many()
                        .set(decided)
                        .filter(progress_entries::Column::Id.eq(progress_id.to_string()))
                        .filter(progress_entries::Column::Status.eq(ProgressStatus::Pending.as_str()))
                        .exec(&db_tx)
                        .await?;
                    if res.rows_affected == 0 {
                        return Err(EngineError::State(
                            "progress entry was decided concurrently".to_string(),
                        ));
                    }

                    let entry = self.find_progress(&db_tx, progress_id).await?;
                    let target = self.find_target(&db_tx, entry.target_id).await?;
                    let target = self.view_of(&db_tx, target).await?;
                    Ok::<_, EngineError>(ProgressOutcome { entry, target })
                })
            })
            .await?;

        tracing::info!(
            progress_id = %progress_id,
            decision = ?decision,
            reviewer = %actor.user_id,
            net_amount = %outcome.target.view.net_amount,
            "progress reviewed"
        );
        self.publish(LedgerEventKind::progress_updated(
            &outcome.entry,
            decision,
            &outcome.target.view,
        ));
        Ok(outcome)
    }

    /// Records progress produced by an approved report directly as
    /// `Approved` on the user's open target.
    pub async fn record_report_progress(
        &self,
        actor: &Actor,
        cmd: ReportProgressCmd,
    ) -> ResultEngine<ProgressOutcome> {
        actor.require_privileged("recording report progress")?;
        require_non_negative(cmd.amount, "amount")?;
        let user_id = normalize_user_id(&cmd.user_id, "user_id")?;
        let source_user_id = normalize_user_id(&cmd.source_user_id, "source_user_id")?;

        let _guard = self.locks.lock([user_id.as_str()]).await;
        let outcome = self
            .retrying("record_report_progress", || async {
                with_tx!(self, |db_tx| {
                    let target = self.open_target(&db_tx, &user_id).await?.ok_or_else(|| {
                        EngineError::State(format!("user {user_id} has no open target"))
                    })?;
                    let now = Utc::now();
                    let entry = ProgressEntry {
                        id: Uuid::new_v4(),
                        target_id: target.id,
                        amount: cmd.amount,
                        category: normalize_category(cmd.category.as_deref()),
                        transaction_date: cmd.transaction_date,
                        status: ProgressStatus::Approved,
                        source_user_id: source_user_id.clone(),
                        approved_by: Some(source_user_id.clone()),
                        approved_at: Some(now),
                        created_at: now,
                    };
                    progress_entries::ActiveModel::from(&entry)
                        .insert(&db_tx)
                        .await?;
                    let target = self.view_of(&db_tx, target).await?;
                    Ok::<_, EngineError>(ProgressOutcome { entry, target })
                })
            })
            .await?;

        tracing::info!(
            progress_id = %outcome.entry.id,
            user_id = %user_id,
            amount = %outcome.entry.amount,
            "report progress recorded"
        );
        self.publish(LedgerEventKind::TargetProgressCreated {
            entry: outcome.entry.clone(),
        });
        self.publish(LedgerEventKind::progress_updated(
            &outcome.entry,
            ReviewDecision::Approved,
            &outcome.target.view,
        ));
        Ok(outcome)
    }
}
