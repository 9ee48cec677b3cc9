use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{
    Account, EngineError, NewAccountCmd, ResultEngine, Transaction, TransactionKind, accounts,
    util::{name_key, normalize_required_name, to_epoch},
};

use super::{Engine, with_tx};

impl Engine {
    /// Moves an account balance by `delta_minor`.
    ///
    /// The new balance is computed by the database (`balance = balance +
    /// delta`), so the previous value is never read back by the caller. This
    /// is the only way ledger operations change a balance.
    pub(super) async fn adjust_balance<C: ConnectionTrait>(
        &self,
        db: &C,
        account_id: Uuid,
        delta_minor: i64,
        now: i64,
    ) -> ResultEngine<()> {
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::BalanceMinor,
                Expr::col(accounts::Column::BalanceMinor).add(delta_minor),
            )
            .col_expr(accounts::Column::UpdatedAt, Expr::value(now))
            .filter(accounts::Column::Id.eq(account_id.to_string()))
            .exec(db)
            .await?;
        if result.rows_affected != 1 {
            return Err(EngineError::KeyNotFound("account not exists".to_string()));
        }
        tracing::trace!(%account_id, delta_minor, "balance adjusted");
        Ok(())
    }

    /// Applies per-account deltas in the order given (ascending account id).
    pub(super) async fn apply_adjustments<C: ConnectionTrait>(
        &self,
        db: &C,
        adjustments: &[(Uuid, i64)],
        now: i64,
    ) -> ResultEngine<()> {
        for (account_id, delta_minor) in adjustments {
            self.adjust_balance(db, *account_id, *delta_minor, now)
                .await?;
        }
        Ok(())
    }

    /// Opens a new account.
    ///
    /// A non-zero `opening_balance_minor` is posted as an opening transaction
    /// (income when positive, expense when negative) so the balance is backed
    /// by the ledger from the start.
    pub async fn new_account(&self, cmd: NewAccountCmd) -> ResultEngine<Uuid> {
        let name = normalize_required_name(&cmd.name, "account_name")?;
        let user_id = cmd.user_id;
        let now = Utc::now();

        let account = Account::new(user_id.clone(), name, cmd.kind, cmd.currency, now);
        let opening = if cmd.opening_balance_minor != 0 {
            let kind = if cmd.opening_balance_minor > 0 {
                TransactionKind::Income
            } else {
                TransactionKind::Expense
            };
            let tx = Transaction {
                id: Uuid::new_v4(),
                owner_id: user_id.clone(),
                account_id: account.id,
                counter_account_id: None,
                category_id: None,
                kind,
                amount_minor: cmd.opening_balance_minor.saturating_abs(),
                description: "Opening balance".to_string(),
                occurred_at: now,
                tags: Vec::new(),
                notes: None,
                recurrence: None,
                idempotency_key: None,
                created_at: now,
                updated_at: now,
            };
            tx.validate()?;
            Some(tx)
        } else {
            None
        };

        with_tx!(self, |db_tx| {
            let exists = accounts::Entity::find()
                .filter(accounts::Column::OwnerId.eq(user_id.as_str()))
                .filter(accounts::Column::NameNorm.eq(name_key(&account.name)))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(account.name.clone()));
            }

            accounts::ActiveModel::from(&account)
                .insert(&db_tx)
                .await
                .map_err(|err| EngineError::existing_on_conflict(err, account.name.as_str()))?;
            if let Some(tx) = &opening {
                self.post_transaction(&db_tx, tx).await?;
            }

            tracing::info!(account_id = %account.id, owner = %user_id, "account opened");
            Ok(account.id)
        })
    }

    /// Return an account snapshot from DB. Inactive accounts are returned too.
    pub async fn account(&self, account_id: Uuid, user_id: &str) -> ResultEngine<Account> {
        self.owned_account(&self.database, user_id, account_id)
            .await
    }

    /// Lists the accounts of `user_id` ordered by name.
    pub async fn accounts(&self, user_id: &str, include_inactive: bool) -> ResultEngine<Vec<Account>> {
        let mut query = accounts::Entity::find().filter(accounts::Column::OwnerId.eq(user_id));
        if !include_inactive {
            query = query.filter(accounts::Column::Active.eq(true));
        }
        query
            .order_by_asc(accounts::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    /// Renames an existing account.
    pub async fn rename_account(
        &self,
        account_id: Uuid,
        new_name: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        let new_name = normalize_required_name(new_name, "account_name")?;
        with_tx!(self, |db_tx| {
            self.owned_account(&db_tx, user_id, account_id).await?;

            let exists = accounts::Entity::find()
                .filter(accounts::Column::OwnerId.eq(user_id))
                .filter(accounts::Column::NameNorm.eq(name_key(&new_name)))
                .filter(accounts::Column::Id.ne(account_id.to_string()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(new_name));
            }

            let active = accounts::ActiveModel {
                id: ActiveValue::Set(account_id.to_string()),
                name: ActiveValue::Set(new_name.clone()),
                name_norm: ActiveValue::Set(name_key(&new_name)),
                updated_at: ActiveValue::Set(to_epoch(Utc::now())),
                ..Default::default()
            };
            active
                .update(&db_tx)
                .await
                .map_err(|err| EngineError::existing_on_conflict(err, new_name))?;
            Ok(())
        })
    }

    /// Activates/deactivates an account.
    ///
    /// An inactive account keeps its balance and its transactions, which can
    /// still be edited or deleted, but it cannot be the target of new
    /// postings.
    pub async fn set_account_active(
        &self,
        account_id: Uuid,
        active: bool,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.owned_account(&db_tx, user_id, account_id).await?;

            let model = accounts::ActiveModel {
                id: ActiveValue::Set(account_id.to_string()),
                active: ActiveValue::Set(active),
                updated_at: ActiveValue::Set(to_epoch(Utc::now())),
                ..Default::default()
            };
            model.update(&db_tx).await?;
            Ok(())
        })
    }
}
