use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveModelTrait, ActiveValue, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    Actor, EngineError, FundShare, FundShareStatus, LedgerEventKind, ResultEngine, ShareFundCmd,
    ShareOutcome, fund_shares,
    util::{normalize_optional_text, normalize_user_id, require_positive},
};

use super::{Engine, with_tx};

impl Engine {
    /// Moves `cmd.amount` of the sender's earned credit to the receiver.
    ///
    /// The sender must own an open target and `amount` must not exceed
    /// `available_to_share`. The receiver needs no target: the share is
    /// recorded and counts once they own one. Both users stay locked from the
    /// balance check until commit.
    pub async fn share_fund(&self, actor: &Actor, cmd: ShareFundCmd) -> ResultEngine<ShareOutcome> {
        require_positive(cmd.amount, "amount")?;
        let from_user_id = normalize_user_id(&cmd.from_user_id, "from_user_id")?;
        let to_user_id = normalize_user_id(&cmd.to_user_id, "to_user_id")?;
        if from_user_id == to_user_id {
            return Err(EngineError::Validation(
                "cannot share funds with yourself".to_string(),
            ));
        }
        if !actor.is_privileged() && actor.user_id != from_user_id {
            return Err(EngineError::Forbidden(
                "only your own credit can be shared".to_string(),
            ));
        }
        let reason = normalize_optional_text(cmd.reason.as_deref());

        let _guard = self
            .locks
            .lock([from_user_id.as_str(), to_user_id.as_str()])
            .await;
        let outcome = self
            .retrying("share_fund", || async {
                with_tx!(self, |db_tx| {
                    let sender_target =
                        self.open_target(&db_tx, &from_user_id).await?.ok_or_else(|| {
                            EngineError::Validation(format!(
                                "user {from_user_id} has no open target to share from"
                            ))
                        })?;
                    let available = self
                        .view_of(&db_tx, sender_target)
                        .await?
                        .view
                        .available_to_share;
                    if cmd.amount > available {
                        return Err(EngineError::InsufficientBalance {
                            available,
                            requested: cmd.amount,
                        });
                    }

                    let share = FundShare {
                        id: Uuid::new_v4(),
                        from_user_id: from_user_id.clone(),
                        to_user_id: to_user_id.clone(),
                        amount: cmd.amount,
                        reason: reason.clone(),
                        status: FundShareStatus::Active,
                        created_by: actor.user_id.clone(),
                        created_at: Utc::now(),
                        reversed_at: None,
                        reversed_by: None,
                        reversal_reason: None,
                    };
                    fund_shares::ActiveModel::from(&share).insert(&db_tx).await?;

                    let sender = self.balance_of(&db_tx, &from_user_id).await?;
                    let receiver = self.balance_of(&db_tx, &to_user_id).await?;
                    Ok::<_, EngineError>(ShareOutcome {
                        share,
                        sender,
                        receiver,
                    })
                })
            })
            .await?;

        tracing::info!(
            fund_share_id = %outcome.share.id,
            from = %outcome.share.from_user_id,
            to = %outcome.share.to_user_id,
            amount = %outcome.share.amount,
            "fund shared"
        );
        self.publish(LedgerEventKind::fund_shared(&outcome.share));
        Ok(outcome)
    }

    /// Reverses an active share.
    ///
    /// Never blocked by the sender's balance: dropping the share restores both
    /// users to exactly their pre-share values.
    pub async fn reverse_fund(
        &self,
        actor: &Actor,
        share_id: Uuid,
        reason: Option<&str>,
    ) -> ResultEngine<ShareOutcome> {
        actor.require_privileged("reversing a fund share")?;
        let reversal_reason = normalize_optional_text(reason);

        let share = self.find_fund_share(&self.database, share_id).await?;
        let _guard = self
            .locks
            .lock([share.from_user_id.as_str(), share.to_user_id.as_str()])
            .await;
        let outcome = self
            .retrying("reverse_fund", || async {
                with_tx!(self, |db_tx| {
                    let share = self.find_fund_share(&db_tx, share_id).await?;
                    if !share.is_active() {
                        return Err(EngineError::State("fund share already reversed".to_string()));
                    }

                    let reversed = fund_shares::ActiveModel {
                        status: ActiveValue::Set(FundShareStatus::Reversed.as_str().to_string()),
                        reversed_at: ActiveValue::Set(Some(Utc::now())),
                        reversed_by: ActiveValue::Set(Some(actor.user_id.clone())),
                        reversal_reason: ActiveValue::Set(reversal_reason.clone()),
                        ..Default::default()
                    };
                    let res = fund_shares::Entity::update_many()
                        .set(reversed)
                        .filter(fund_shares::Column::Id.eq(share_id.to_string()))
                        .filter(fund_shares::Column::Status.eq(FundShareStatus::Active.as_str()))
                        .exec(&db_tx)
                        .await?;
                    if res.rows_affected == 0 {
                        return Err(EngineError::State(
                            "fund share was reversed concurrently".to_string(),
                        ));
                    }

                    let share = self.find_fund_share(&db_tx, share_id).await?;
                    let sender = self.balance_of(&db_tx, &share.from_user_id).await?;
                    let receiver = self.balance_of(&db_tx, &share.to_user_id).await?;
                    Ok::<_, EngineError>(ShareOutcome {
                        share,
                        sender,
                        receiver,
                    })
                })
            })
            .await?;

        tracing::info!(
            fund_share_id = %share_id,
            reversed_by = %actor.user_id,
            amount = %outcome.share.amount,
            "fund share reversed"
        );
        self.publish(LedgerEventKind::fund_reversed(&outcome.share));
        Ok(outcome)
    }
}
