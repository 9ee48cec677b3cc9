//! Ledger operations on transactions.
//!
//! Writes (`create`, `update`, `delete`) follow the same shape:
//!
//! 1. validate everything that does not need the database
//! 2. lock every account involved, in ascending id order
//! 3. inside one DB transaction: validate references, write the row, move
//!    balances with relative adjustments
//! 4. re-read the row joined with its display fields

use sea_orm::{ActiveModelTrait, ConnectionTrait};

use crate::{
    ResultEngine, Transaction, TransactionView,
    transactions::{self, net_adjustments},
    util::to_epoch,
};

use super::Engine;

mod create;
mod delete;
mod detail;
mod list;
mod update;

pub use list::TransactionListFilter;

impl Engine {
    /// Inserts a validated transaction and applies its effects.
    ///
    /// Callers hold the locks of `tx.account_ids()` and run this inside a DB
    /// transaction.
    pub(super) async fn post_transaction<C: ConnectionTrait>(
        &self,
        db: &C,
        tx: &Transaction,
    ) -> ResultEngine<()> {
        transactions::ActiveModel::try_from(tx)?.insert(db).await?;
        let adjustments = net_adjustments(&[], &tx.effects());
        self.apply_adjustments(db, &adjustments, to_epoch(tx.updated_at))
            .await?;
        tracing::debug!(
            transaction_id = %tx.id,
            kind = tx.kind.as_str(),
            amount_minor = tx.amount_minor,
            "transaction posted"
        );
        Ok(())
    }

    /// Joins a transaction with the display fields of its references.
    pub(super) async fn view_of<C: ConnectionTrait>(
        &self,
        db: &C,
        tx: Transaction,
    ) -> ResultEngine<TransactionView> {
        let user_id = tx.owner_id.as_str();
        let account = self.owned_account(db, user_id, tx.account_id).await?;
        let counter_account_name = match tx.counter_account_id {
            Some(id) => Some(self.owned_account(db, user_id, id).await?.name),
            None => None,
        };
        let category = match tx.category_id {
            Some(id) => Some(self.owned_category(db, user_id, id).await?.into()),
            None => None,
        };

        Ok(TransactionView {
            account_name: account.name,
            account_kind: account.kind,
            counter_account_name,
            category,
            transaction: tx,
        })
    }
}
