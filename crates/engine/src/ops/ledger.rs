//! Ledger store access: row loaders shared by every operation and the public
//! read surface.
//!
//! Loaders take any `ConnectionTrait` so mutations can call them on their open
//! transaction and reads can call them on a read transaction.

use sea_orm::{
    Condition, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, FundShare, FundShareStatus, LedgerTotals, Money, ProgressEntry, ProgressStatus,
    ResultEngine, Target, TargetStatus, TargetView, UserBalance, fund_shares, progress_entries,
    recalc, targets, util::normalize_user_id,
};

use super::{Engine, with_tx};

fn open_statuses() -> [&'static str; 2] {
    [TargetStatus::Active.as_str(), TargetStatus::Extended.as_str()]
}

impl Engine {
    pub(super) async fn find_target<C: ConnectionTrait>(
        &self,
        db: &C,
        target_id: Uuid,
    ) -> ResultEngine<Target> {
        let model = targets::Entity::find_by_id(target_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("target".to_string()))?;
        Target::try_from(model)
    }

    pub(super) async fn find_progress<C: ConnectionTrait>(
        &self,
        db: &C,
        progress_id: Uuid,
    ) -> ResultEngine<ProgressEntry> {
        let model = progress_entries::Entity::find_by_id(progress_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("progress entry".to_string()))?;
        ProgressEntry::try_from(model)
    }

    pub(super) async fn find_fund_share<C: ConnectionTrait>(
        &self,
        db: &C,
        share_id: Uuid,
    ) -> ResultEngine<FundShare> {
        let model = fund_shares::Entity::find_by_id(share_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("fund share".to_string()))?;
        FundShare::try_from(model)
    }

    /// The user's open (Active/Extended) target, if any.
    pub(super) async fn open_target<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<Option<Target>> {
        targets::Entity::find()
            .filter(targets::Column::UserId.eq(user_id))
            .filter(targets::Column::Status.is_in(open_statuses()))
            .order_by_desc(targets::Column::CreatedAt)
            .one(db)
            .await?
            .map(Target::try_from)
            .transpose()
    }

    /// The target derived values are computed against: the open target, or
    /// the most recent one by period start when none is open.
    pub(super) async fn current_target_of<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<Option<Target>> {
        if let Some(open) = self.open_target(db, user_id).await? {
            return Ok(Some(open));
        }
        targets::Entity::find()
            .filter(targets::Column::UserId.eq(user_id))
            .order_by_desc(targets::Column::PeriodStart)
            .order_by_desc(targets::Column::CreatedAt)
            .one(db)
            .await?
            .map(Target::try_from)
            .transpose()
    }

    async fn approved_progress<C: ConnectionTrait>(
        &self,
        db: &C,
        target_id: Uuid,
    ) -> ResultEngine<Vec<ProgressEntry>> {
        progress_entries::Entity::find()
            .filter(progress_entries::Column::TargetId.eq(target_id.to_string()))
            .filter(progress_entries::Column::Status.eq(ProgressStatus::Approved.as_str()))
            .all(db)
            .await?
            .into_iter()
            .map(ProgressEntry::try_from)
            .collect()
    }

    async fn active_shares_of<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<Vec<FundShare>> {
        fund_shares::Entity::find()
            .filter(fund_shares::Column::Status.eq(FundShareStatus::Active.as_str()))
            .filter(
                Condition::any()
                    .add(fund_shares::Column::FromUserId.eq(user_id))
                    .add(fund_shares::Column::ToUserId.eq(user_id)),
            )
            .all(db)
            .await?
            .into_iter()
            .map(FundShare::try_from)
            .collect()
    }

    /// Recomputes `target`'s derived view from the current ledger rows.
    ///
    /// Progress is counted per target, but shares belong to the user: a past
    /// target's view still carries every active share of its owner, the same
    /// totals their current target sees.
    pub(super) async fn view_of<C: ConnectionTrait>(
        &self,
        db: &C,
        target: Target,
    ) -> ResultEngine<TargetView> {
        let progress = self.approved_progress(db, target.id).await?;
        let shares = self.active_shares_of(db, &target.user_id).await?;
        let view = recalc::recompute(&target, &progress, &shares);
        Ok(TargetView { target, view })
    }

    /// Recomputes `user_id`'s balance against their current target.
    pub(super) async fn balance_of<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<UserBalance> {
        match self.current_target_of(db, user_id).await? {
            Some(target) => {
                let TargetView { target, view } = self.view_of(db, target).await?;
                Ok(UserBalance {
                    user_id: user_id.to_string(),
                    target: Some(target),
                    view,
                })
            }
            None => {
                let shares = self.active_shares_of(db, user_id).await?;
                let totals = LedgerTotals::from_rows(user_id, None, &[], &shares);
                Ok(UserBalance {
                    user_id: user_id.to_string(),
                    target: None,
                    view: recalc::derive(Money::ZERO, totals),
                })
            }
        }
    }

    /// A target and its recomputed balance.
    pub async fn target(&self, target_id: Uuid) -> ResultEngine<TargetView> {
        with_tx!(self, |db_tx| {
            let target = self.find_target(&db_tx, target_id).await?;
            self.view_of(&db_tx, target).await
        })
    }

    /// The user's current target: the open one, otherwise the most recent.
    pub async fn current_target(&self, user_id: &str) -> ResultEngine<Option<TargetView>> {
        let user_id = normalize_user_id(user_id, "user_id")?;
        with_tx!(self, |db_tx| {
            match self.current_target_of(&db_tx, &user_id).await? {
                Some(target) => self.view_of(&db_tx, target).await.map(Some),
                None => Ok(None),
            }
        })
    }

    /// The user's balance, including shares received before owning a target.
    pub async fn balance(&self, user_id: &str) -> ResultEngine<UserBalance> {
        let user_id = normalize_user_id(user_id, "user_id")?;
        with_tx!(self, |db_tx| { self.balance_of(&db_tx, &user_id).await })
    }

    /// All targets of a user, most recent period first.
    pub async fn list_targets(&self, user_id: &str) -> ResultEngine<Vec<Target>> {
        let user_id = normalize_user_id(user_id, "user_id")?;
        targets::Entity::find()
            .filter(targets::Column::UserId.eq(user_id))
            .order_by_desc(targets::Column::PeriodStart)
            .order_by_desc(targets::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Target::try_from)
            .collect()
    }

    /// Every progress entry of a target (any status), newest first.
    pub async fn list_progress(&self, target_id: Uuid) -> ResultEngine<Vec<ProgressEntry>> {
        with_tx!(self, |db_tx| {
            self.find_target(&db_tx, target_id).await?;
            progress_entries::Entity::find()
                .filter(progress_entries::Column::TargetId.eq(target_id.to_string()))
                .order_by_desc(progress_entries::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(ProgressEntry::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Shares sent or received by a user, newest first.
    pub async fn list_fund_shares(
        &self,
        user_id: &str,
        include_reversed: bool,
    ) -> ResultEngine<Vec<FundShare>> {
        let user_id = normalize_user_id(user_id, "user_id")?;
        let mut query = fund_shares::Entity::find().filter(
            Condition::any()
                .add(fund_shares::Column::FromUserId.eq(user_id.as_str()))
                .add(fund_shares::Column::ToUserId.eq(user_id.as_str())),
        );
        if !include_reversed {
            query = query.filter(fund_shares::Column::Status.eq(FundShareStatus::Active.as_str()));
        }
        query
            .order_by_desc(fund_shares::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(FundShare::try_from)
            .collect()
    }
}
