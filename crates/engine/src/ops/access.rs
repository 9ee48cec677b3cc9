use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    Account, Category, EngineError, ResultEngine, Transaction, accounts, categories,
    locks::AccountGuard, transactions,
};

use super::Engine;

/// How many times a row whose account references keep moving is re-locked
/// before giving up.
const LOCK_ATTEMPTS: usize = 3;

/// Generates an owner-scoped lookup returning the domain type. Rows owned by
/// someone else are reported exactly like missing rows.
macro_rules! impl_owned_lookup {
    ($fn_name:ident, $entity:path, $owner_col:expr, $domain:ty, $err_msg:literal) => {
        pub(super) async fn $fn_name<C: ConnectionTrait>(
            &self,
            db: &C,
            user_id: &str,
            id: Uuid,
        ) -> ResultEngine<$domain> {
            let model = <$entity>::find_by_id(id.to_string())
                .filter($owner_col.eq(user_id))
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound($err_msg.to_string()))?;
            <$domain>::try_from(model)
        }
    };
}

impl Engine {
    impl_owned_lookup!(
        owned_account,
        accounts::Entity,
        accounts::Column::OwnerId,
        Account,
        "account not exists"
    );

    impl_owned_lookup!(
        owned_category,
        categories::Entity,
        categories::Column::OwnerId,
        Category,
        "category not exists"
    );

    impl_owned_lookup!(
        owned_transaction,
        transactions::Entity,
        transactions::Column::OwnerId,
        Transaction,
        "transaction not exists"
    );

    /// Account usable as a new transaction target: exists, owned, active.
    pub(super) async fn resolve_account<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<Account> {
        let account = self.owned_account(db, user_id, account_id).await?;
        if !account.active {
            return Err(EngineError::KeyNotFound("account not active".to_string()));
        }
        Ok(account)
    }

    /// Category usable on a transaction: exists, owned, active.
    pub(super) async fn resolve_category<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        category_id: Uuid,
    ) -> ResultEngine<Category> {
        let category = self.owned_category(db, user_id, category_id).await?;
        if !category.active {
            return Err(EngineError::KeyNotFound("category not active".to_string()));
        }
        Ok(category)
    }

    /// Locks the accounts a stored transaction currently references, plus
    /// `extra`.
    ///
    /// The references are read before locking, so they are checked again once
    /// the locks are held; if another operation moved the transaction in
    /// between, locking starts over with every account seen so far.
    pub(super) async fn lock_transaction(
        &self,
        user_id: &str,
        transaction_id: Uuid,
        extra: &[Uuid],
    ) -> ResultEngine<AccountGuard> {
        let current = self
            .owned_transaction(&self.database, user_id, transaction_id)
            .await?;
        let mut ids = current.account_ids();
        ids.extend_from_slice(extra);

        for _ in 0..LOCK_ATTEMPTS {
            let guard = self.locks.acquire(ids.iter().copied()).await;

            let latest = self
                .owned_transaction(&self.database, user_id, transaction_id)
                .await?;
            let latest_ids = latest.account_ids();
            if guard.covers(&latest_ids) {
                return Ok(guard);
            }
            drop(guard);
            tracing::debug!(%transaction_id, "transaction accounts moved while locking, retrying");
            ids.extend(latest_ids);
        }
        Err(EngineError::Conflict(format!(
            "transaction {transaction_id} is being modified concurrently"
        )))
    }
}
