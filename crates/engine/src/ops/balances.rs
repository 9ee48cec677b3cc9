use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    ActiveValue, Condition, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};

use crate::{
    Account, BalanceDrift, EngineError, ResultEngine, Transaction, accounts, locks::AccountGuard,
    transactions, util::to_epoch,
};

use super::{Engine, with_tx};

impl Engine {
    /// Replays the transactions of `user_id` and returns the balance each of
    /// their accounts should hold. With `account` set only the transactions
    /// touching that account are read.
    async fn expected_balances<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        account: Option<Uuid>,
    ) -> ResultEngine<HashMap<Uuid, i64>> {
        let mut query =
            transactions::Entity::find().filter(transactions::Column::OwnerId.eq(user_id));
        if let Some(account_id) = account {
            let id = account_id.to_string();
            query = query.filter(
                Condition::any()
                    .add(transactions::Column::AccountId.eq(id.as_str()))
                    .add(transactions::Column::CounterAccountId.eq(id.as_str())),
            );
        }
        let models = query.all(db).await?;

        let mut expected: HashMap<Uuid, i64> = HashMap::new();
        for model in models {
            let tx = Transaction::try_from(model)?;
            for (account_id, delta) in tx.effects() {
                let balance = expected.entry(account_id).or_default();
                *balance = balance.checked_add(delta).ok_or_else(|| {
                    EngineError::invalid("amount_minor", "balance overflow while replaying")
                })?;
            }
        }
        Ok(expected)
    }

    /// Locks every account `user_id` currently owns.
    async fn lock_owner_accounts(&self, user_id: &str) -> ResultEngine<AccountGuard> {
        let ids: Vec<Uuid> = self
            .owner_accounts(&self.database, user_id)
            .await?
            .into_iter()
            .map(|account| account.id)
            .collect();
        Ok(self.locks.acquire(ids).await)
    }

    async fn owner_accounts<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<Vec<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::OwnerId.eq(user_id))
            .order_by_asc(accounts::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    async fn drifts<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<Vec<BalanceDrift>> {
        let expected = self.expected_balances(db, user_id, None).await?;
        let drifts = self
            .owner_accounts(db, user_id)
            .await?
            .into_iter()
            .filter_map(|account| {
                let expected_minor = expected.get(&account.id).copied().unwrap_or(0);
                (account.balance_minor != expected_minor).then_some(BalanceDrift {
                    account_id: account.id,
                    stored_minor: account.balance_minor,
                    expected_minor,
                })
            })
            .collect();
        Ok(drifts)
    }

    /// Returns the account after checking its stored balance against the sum
    /// of the transactions referencing it.
    ///
    /// Both reads happen in one transaction under the account's lock. A
    /// mismatch is reported as [`EngineError::LedgerInconsistent`]; nothing is
    /// written.
    pub async fn check_account(&self, account_id: Uuid, user_id: &str) -> ResultEngine<Account> {
        let guard = self.locks.acquire([account_id]).await;
        let (account, expected) = with_tx!(self, |db_tx| {
            let account = self.owned_account(&db_tx, user_id, account_id).await?;
            let expected = self
                .expected_balances(&db_tx, user_id, Some(account_id))
                .await?
                .get(&account_id)
                .copied()
                .unwrap_or(0);
            Ok((account, expected))
        })?;
        drop(guard);

        if account.balance_minor != expected {
            tracing::warn!(
                %account_id,
                stored = account.balance_minor,
                expected,
                "ledger inconsistent"
            );
            return Err(EngineError::LedgerInconsistent {
                account_id,
                stored: account.balance_minor,
                expected,
            });
        }
        Ok(account)
    }

    /// Lists every account of `user_id` whose stored balance drifted from its
    /// transactions. Read-only; holds the same locks as a repair.
    pub async fn verify_ledger(&self, user_id: &str) -> ResultEngine<Vec<BalanceDrift>> {
        let guard = self.lock_owner_accounts(user_id).await?;
        let drifts = with_tx!(self, |db_tx| self.drifts(&db_tx, user_id).await)?;
        drop(guard);
        for drift in &drifts {
            tracing::warn!(
                account_id = %drift.account_id,
                stored = drift.stored_minor,
                expected = drift.expected_minor,
                "balance drift detected"
            );
        }
        Ok(drifts)
    }

    /// Rewrites drifted balances of `user_id` from the ledger and returns what
    /// was corrected.
    ///
    /// Every account of the owner is locked for the duration, so no posting
    /// can interleave with the replay.
    pub async fn repair_ledger(&self, user_id: &str) -> ResultEngine<Vec<BalanceDrift>> {
        let guard = self.lock_owner_accounts(user_id).await?;

        let repaired = with_tx!(self, |db_tx| {
            let drifts = self.drifts(&db_tx, user_id).await?;
            let now = to_epoch(Utc::now());
            for drift in &drifts {
                let model = accounts::ActiveModel {
                    id: ActiveValue::Set(drift.account_id.to_string()),
                    balance_minor: ActiveValue::Set(drift.expected_minor),
                    updated_at: ActiveValue::Set(now),
                    ..Default::default()
                };
                model.update(&db_tx).await?;
                tracing::info!(
                    account_id = %drift.account_id,
                    from = drift.stored_minor,
                    to = drift.expected_minor,
                    "balance repaired"
                );
            }
            Ok(drifts)
        })?;
        drop(guard);
        Ok(repaired)
    }

    /// Every owner with at least one account, sorted.
    pub async fn owners(&self) -> ResultEngine<Vec<String>> {
        let owners: Vec<String> = accounts::Entity::find()
            .select_only()
            .column(accounts::Column::OwnerId)
            .distinct()
            .order_by_asc(accounts::Column::OwnerId)
            .into_tuple()
            .all(&self.database)
            .await?;
        Ok(owners)
    }
}
