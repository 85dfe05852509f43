use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use sea_orm::{ActiveModelTrait, ConnectionTrait, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    Actor, CreateTargetCmd, EngineError, LedgerEventKind, Money, ResultEngine, Target,
    TargetPatch, TargetStatus, TargetView, progress_entries, targets,
    util::{
        normalize_category, normalize_optional_text, normalize_user_id, require_non_negative,
        require_positive, require_within_max,
    },
};

use super::{Engine, with_tx};

fn validate_period(start: NaiveDate, end: Option<NaiveDate>) -> ResultEngine<()> {
    if let Some(end) = end
        && end < start
    {
        return Err(EngineError::Validation(format!(
            "period_end {end} is before period_start {start}"
        )));
    }
    Ok(())
}

impl Engine {
    /// Owner of a target; user ids never change, so this is safe to read
    /// before taking the owner's lock.
    pub(super) async fn target_owner(&self, target_id: Uuid) -> ResultEngine<String> {
        Ok(self.find_target(&self.database, target_id).await?.user_id)
    }

    /// Fails with `Conflict` when `user_id` already has an open target other
    /// than `except`.
    async fn ensure_no_open_target<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        if let Some(open) = self.open_target(db, user_id).await?
            && Some(open.id) != except
        {
            return Err(EngineError::Conflict(format!(
                "user {user_id} already has an open target ({})",
                open.id
            )));
        }
        Ok(())
    }

    async fn save_target<C: ConnectionTrait>(&self, db: &C, target: &Target) -> ResultEngine<()> {
        targets::ActiveModel::from(target).update(db).await?;
        Ok(())
    }

    /// Creates an `Active` target for `cmd.user_id`.
    ///
    /// Fails with `Conflict` if the user already has an open (Active or
    /// Extended) target.
    pub async fn create_target(&self, actor: &Actor, cmd: CreateTargetCmd) -> ResultEngine<TargetView> {
        actor.require_privileged("creating a target")?;
        let user_id = normalize_user_id(&cmd.user_id, "user_id")?;
        require_non_negative(cmd.target_amount, "target_amount")?;
        validate_period(cmd.period_start, cmd.period_end)?;

        let _guard = self.locks.lock([user_id.as_str()]).await;
        let created = self
            .retrying("create_target", || async {
                with_tx!(self, |db_tx| {
                    self.ensure_no_open_target(&db_tx, &user_id, None).await?;
                    let now = Utc::now();
                    let target = Target {
                        id: Uuid::new_v4(),
                        user_id: user_id.clone(),
                        target_amount: cmd.target_amount,
                        category: normalize_category(cmd.category.as_deref()),
                        period_start: cmd.period_start,
                        period_end: cmd.period_end,
                        status: TargetStatus::Active,
                        notes: normalize_optional_text(cmd.notes.as_deref()),
                        created_by: actor.user_id.clone(),
                        created_at: now,
                        updated_at: now,
                    };
                    targets::ActiveModel::from(&target).insert(&db_tx).await?;
                    self.view_of(&db_tx, target).await
                })
            })
            .await?;

        tracing::info!(
            target_id = %created.target.id,
            user_id = %created.target.user_id,
            amount = %created.target.target_amount,
            "target created"
        );
        self.publish(LedgerEventKind::TargetCreated {
            target: created.target.clone(),
            view: created.view,
        });
        Ok(created)
    }

    /// Applies `patch` to a target.
    ///
    /// Non-admin actors may only edit `category`/`notes` of their own target;
    /// everything else fails with `Forbidden`. Status changes follow
    /// [`TargetStatus::can_transition_to`].
    pub async fn edit_target(
        &self,
        actor: &Actor,
        target_id: Uuid,
        patch: TargetPatch,
    ) -> ResultEngine<TargetView> {
        if patch.is_empty() {
            return Err(EngineError::Validation("empty target patch".to_string()));
        }
        if let Some(amount) = patch.target_amount {
            require_non_negative(amount, "target_amount")?;
        }

        let owner = self.target_owner(target_id).await?;
        if !actor.is_privileged() {
            if actor.user_id != owner {
                return Err(EngineError::Forbidden(
                    "only the owner or an admin may edit a target".to_string(),
                ));
            }
            if patch.touches_privileged_fields() {
                return Err(EngineError::Forbidden(
                    "amount, period and status changes require admin".to_string(),
                ));
            }
        }

        let _guard = self.locks.lock([owner.as_str()]).await;
        let updated = self
            .retrying("edit_target", || async {
                with_tx!(self, |db_tx| {
                    let mut target = self.find_target(&db_tx, target_id).await?;

                    if let Some(status) = patch.status {
                        if !target.status.can_transition_to(status) {
                            return Err(EngineError::State(format!(
                                "cannot move target from {} to {}",
                                target.status.as_str(),
                                status.as_str()
                            )));
                        }
                        if status.is_open() && !target.status.is_open() {
                            self.ensure_no_open_target(&db_tx, &target.user_id, Some(target.id))
                                .await?;
                        }
                        target.status = status;
                    }
                    if let Some(amount) = patch.target_amount {
                        target.target_amount = amount;
                    }
                    if let Some(start) = patch.period_start {
                        target.period_start = start;
                    }
                    if let Some(end) = patch.period_end {
                        target.period_end = end;
                    }
                    validate_period(target.period_start, target.period_end)?;
                    if let Some(category) = &patch.category {
                        target.category = normalize_category(category.as_deref());
                    }
                    if let Some(notes) = &patch.notes {
                        target.notes = normalize_optional_text(notes.as_deref());
                    }
                    target.updated_at = Utc::now();

                    self.save_target(&db_tx, &target).await?;
                    self.view_of(&db_tx, target).await
                })
            })
            .await?;

        tracing::info!(target_id = %target_id, actor = %actor.user_id, "target edited");
        self.publish(LedgerEventKind::TargetUpdated {
            target_id,
            target: Some(updated.target.clone()),
            view: Some(updated.view),
        });
        Ok(updated)
    }

    /// Raises a reached target by `additional_amount` and marks it
    /// `Extended`, optionally moving `period_end`.
    ///
    /// Only open targets at or above 100% progress are eligible; anything
    /// else fails with `State`.
    pub async fn extend_target(
        &self,
        actor: &Actor,
        target_id: Uuid,
        additional_amount: Money,
        new_period_end: Option<NaiveDate>,
    ) -> ResultEngine<TargetView> {
        actor.require_privileged("extending a target")?;
        require_positive(additional_amount, "additional_amount")?;

        let owner = self.target_owner(target_id).await?;
        let _guard = self.locks.lock([owner.as_str()]).await;
        let extended = self
            .retrying("extend_target", || async {
                with_tx!(self, |db_tx| {
                    let target = self.find_target(&db_tx, target_id).await?;
                    if !target.status.is_open() {
                        return Err(EngineError::State(format!(
                            "cannot extend a {} target",
                            target.status.as_str()
                        )));
                    }
                    let TargetView { mut target, view } = self.view_of(&db_tx, target).await?;
                    if !view.is_reached() {
                        return Err(EngineError::State(format!(
                            "target not eligible for extension: progress {}% is below 100%",
                            view.progress_percentage
                        )));
                    }
                    if let Some(end) = new_period_end {
                        validate_period(target.period_start, Some(end))?;
                        target.period_end = Some(end);
                    }
                    target.target_amount = target
                        .target_amount
                        .checked_add(additional_amount)
                        .ok_or_else(|| EngineError::Validation("target_amount too large".to_string()))?;
                    require_within_max(target.target_amount, "target_amount")?;
                    target.status = TargetStatus::Extended;
                    target.updated_at = Utc::now();

                    self.save_target(&db_tx, &target).await?;
                    self.view_of(&db_tx, target).await
                })
            })
            .await?;

        tracing::info!(
            target_id = %target_id,
            added = %additional_amount,
            target_amount = %extended.target.target_amount,
            "target extended"
        );
        self.publish(LedgerEventKind::TargetUpdated {
            target_id,
            target: Some(extended.target.clone()),
            view: Some(extended.view),
        });
        Ok(extended)
    }

    /// Hard-deletes a target and its progress entries.
    ///
    /// Fund shares are keyed by user and survive; the owner's balance is
    /// recomputed against whatever target is current afterwards.
    pub async fn delete_target(&self, actor: &Actor, target_id: Uuid) -> ResultEngine<Target> {
        actor.require_privileged("deleting a target")?;

        let owner = self.target_owner(target_id).await?;
        let _guard = self.locks.lock([owner.as_str()]).await;
        let deleted = self
            .retrying("delete_target", || async {
                with_tx!(self, |db_tx| {
                    let target = self.find_target(&db_tx, target_id).await?;
                    let removed = progress_entries::Entity::delete_many()
                        .filter(progress_entries::Column::TargetId.eq(target_id.to_string()))
                        .exec(&db_tx)
                        .await?
                        .rows_affected;
                    targets::Entity::delete_by_id(target_id.to_string())
                        .exec(&db_tx)
                        .await?;
                    tracing::debug!(target_id = %target_id, removed, "progress entries removed");
                    Ok::<_, EngineError>(target)
                })
            })
            .await?;

        tracing::info!(target_id = %target_id, user_id = %deleted.user_id, "target deleted");
        self.publish(LedgerEventKind::TargetUpdated {
            target_id,
            target: None,
            view: None,
        });
        self.publish(LedgerEventKind::TargetDeleted {
            target_id,
            user_id: deleted.user_id.clone(),
        });
        Ok(deleted)
    }
}
