use chrono::Utc;
use uuid::Uuid;

use sea_orm::{TransactionTrait, prelude::*};

use crate::{
    ResultEngine,
    transactions::{self, net_adjustments},
    util::to_epoch,
};

use super::super::{Engine, with_tx};

impl Engine {
    /// Deletes a transaction and reverses its effect on every account it
    /// referenced.
    ///
    /// Deleting an already deleted transaction fails with `KeyNotFound` and
    /// leaves balances untouched.
    pub async fn delete_transaction(&self, transaction_id: Uuid, user_id: &str) -> ResultEngine<()> {
        let guard = self.lock_transaction(user_id, transaction_id, &[]).await?;
        with_tx!(self, |db_tx| {
            let tx = self
                .owned_transaction(&db_tx, user_id, transaction_id)
                .await?;

            transactions::Entity::delete_by_id(transaction_id.to_string())
                .exec(&db_tx)
                .await?;
            let adjustments = net_adjustments(&tx.effects(), &[]);
            self.apply_adjustments(&db_tx, &adjustments, to_epoch(Utc::now()))
                .await?;

            tracing::debug!(%transaction_id, "transaction deleted");
            Ok(())
        })?;
        drop(guard);
        Ok(())
    }
}
