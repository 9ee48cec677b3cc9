use chrono::Utc;
use uuid::Uuid;

use sea_orm::{QueryFilter, TransactionTrait, prelude::*};

use crate::{
    CreateTransactionCmd, EngineError, ResultEngine, Transaction, TransactionView,
    tags::normalize_tags,
    transactions,
    util::{normalize_optional_text, parse_uuid},
};

use super::super::{Engine, with_tx};

impl Engine {
    /// Creates a transaction and applies its effect to the referenced
    /// account(s).
    ///
    /// - income: `account += amount`
    /// - expense: `account -= amount`
    /// - transfer: `account -= amount`, `counter_account += amount`
    ///
    /// Every validation runs before the first write. When `idempotency_key`
    /// was already used by the same owner, the stored transaction is returned
    /// and no balance moves.
    pub async fn create_transaction(
        &self,
        cmd: CreateTransactionCmd,
    ) -> ResultEngine<TransactionView> {
        let user_id = cmd.user_id;
        let now = Utc::now();
        let tx = Transaction {
            id: Uuid::new_v4(),
            owner_id: user_id.clone(),
            account_id: cmd.account_id,
            counter_account_id: cmd.counter_account_id,
            category_id: cmd.category_id,
            kind: cmd.kind,
            amount_minor: cmd.amount_minor,
            description: cmd.description.trim().to_string(),
            occurred_at: cmd.occurred_at,
            tags: normalize_tags(cmd.tags)?,
            notes: normalize_optional_text(cmd.notes.as_deref()),
            recurrence: cmd.recurrence,
            idempotency_key: normalize_optional_text(cmd.idempotency_key.as_deref()),
            created_at: now,
            updated_at: now,
        };
        tx.validate()?;

        let guard = self.locks.acquire(tx.account_ids()).await;
        let transaction_id = with_tx!(self, |db_tx| {
            let replayed = match tx.idempotency_key.as_deref() {
                Some(key) => {
                    transactions::Entity::find()
                        .filter(transactions::Column::OwnerId.eq(user_id.as_str()))
                        .filter(transactions::Column::IdempotencyKey.eq(key))
                        .one(&db_tx)
                        .await?
                }
                None => None,
            };

            match replayed {
                Some(existing) => {
                    tracing::debug!(
                        transaction_id = %existing.id,
                        "idempotency key replayed, nothing posted"
                    );
                    parse_uuid(&existing.id, "transaction_id")
                }
                None => {
                    let account = self
                        .resolve_account(&db_tx, &user_id, tx.account_id)
                        .await?;
                    if let Some(counter_id) = tx.counter_account_id {
                        let counter = self.resolve_account(&db_tx, &user_id, counter_id).await?;
                        if counter.currency != account.currency {
                            return Err(EngineError::invalid(
                                "counter_account_id",
                                format!(
                                    "currency {} differs from source currency {}",
                                    counter.currency, account.currency
                                ),
                            ));
                        }
                    }
                    if let Some(category_id) = tx.category_id {
                        self.resolve_category(&db_tx, &user_id, category_id)
                            .await?;
                    }

                    self.post_transaction(&db_tx, &tx).await?;
                    Ok(tx.id)
                }
            }
        })?;
        drop(guard);

        self.transaction(transaction_id, &user_id).await
    }
}
