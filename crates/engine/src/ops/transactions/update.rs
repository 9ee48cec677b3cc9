use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{ActiveModelTrait, TransactionTrait};

use crate::{
    EngineError, ResultEngine, Transaction, TransactionKind, TransactionView,
    UpdateTransactionCmd,
    tags::normalize_tags,
    transactions::{self, net_adjustments},
    util::{ensure_positive_amount, normalize_optional_text, to_epoch},
};

use super::super::{Engine, with_tx};

/// Applies the requested changes to a copy of the stored transaction.
///
/// The counter account follows the staged kind: an explicit value wins,
/// a transfer keeps its current destination, other kinds drop it.
fn stage_update(
    existing: &Transaction,
    cmd: &UpdateTransactionCmd,
    tags: Option<Vec<String>>,
    now: DateTime<Utc>,
) -> Transaction {
    let mut staged = existing.clone();
    if let Some(account_id) = cmd.account_id {
        staged.account_id = account_id;
    }
    if let Some(kind) = cmd.kind {
        staged.kind = kind;
    }
    staged.counter_account_id = match cmd.counter_account_id {
        Some(counter) => counter,
        None if staged.kind == TransactionKind::Transfer => existing.counter_account_id,
        None => None,
    };
    if let Some(category_id) = cmd.category_id {
        staged.category_id = category_id;
    }
    if let Some(amount_minor) = cmd.amount_minor {
        staged.amount_minor = amount_minor;
    }
    if let Some(description) = &cmd.description {
        staged.description = description.trim().to_string();
    }
    if let Some(occurred_at) = cmd.occurred_at {
        staged.occurred_at = occurred_at;
    }
    if let Some(tags) = tags {
        staged.tags = tags;
    }
    if let Some(notes) = &cmd.notes {
        staged.notes = normalize_optional_text(notes.as_deref());
    }
    if let Some(recurrence) = cmd.recurrence {
        staged.recurrence = recurrence;
    }
    staged.updated_at = now;
    staged
}

impl Engine {
    /// Updates a transaction and reconciles every affected balance.
    ///
    /// The old effect is reversed and the new one applied in the same database
    /// transaction, so amount, kind and account may all change at once.
    /// Updating only metadata leaves balances untouched. Replaying the same
    /// update is harmless: the second call nets to zero.
    pub async fn update_transaction(
        &self,
        cmd: UpdateTransactionCmd,
    ) -> ResultEngine<TransactionView> {
        if cmd.is_empty() {
            return Err(EngineError::invalid("update", "no fields to update"));
        }
        if let Some(amount_minor) = cmd.amount_minor {
            ensure_positive_amount(amount_minor)?;
        }
        let tags = cmd.tags.clone().map(normalize_tags).transpose()?;

        let user_id = cmd.user_id.as_str();
        let transaction_id = cmd.transaction_id;
        let mut extra: Vec<Uuid> = cmd.account_id.into_iter().collect();
        extra.extend(cmd.counter_account_id.flatten());

        let guard = self.lock_transaction(user_id, transaction_id, &extra).await?;
        with_tx!(self, |db_tx| {
            let existing = self
                .owned_transaction(&db_tx, user_id, transaction_id)
                .await?;
            let staged = stage_update(&existing, &cmd, tags, Utc::now());
            staged.validate()?;

            // Only newly referenced rows must be active; existing postings on
            // a deactivated account can still be corrected.
            let account = if staged.account_id == existing.account_id {
                self.owned_account(&db_tx, user_id, staged.account_id)
                    .await?
            } else {
                self.resolve_account(&db_tx, user_id, staged.account_id)
                    .await?
            };
            if let Some(counter_id) = staged.counter_account_id {
                let counter = if Some(counter_id) == existing.counter_account_id {
                    self.owned_account(&db_tx, user_id, counter_id).await?
                } else {
                    self.resolve_account(&db_tx, user_id, counter_id).await?
                };
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
            if let Some(category_id) = staged.category_id
                && staged.category_id != existing.category_id
            {
                self.resolve_category(&db_tx, user_id, category_id).await?;
            }

            transactions::ActiveModel::try_from(&staged)?
                .update(&db_tx)
                .await?;

            if cmd.touches_balances() {
                let adjustments = net_adjustments(&existing.effects(), &staged.effects());
                self.apply_adjustments(&db_tx, &adjustments, to_epoch(staged.updated_at))
                    .await?;
                tracing::debug!(
                    %transaction_id,
                    accounts = adjustments.len(),
                    "transaction balances reconciled"
                );
            }
            Ok(())
        })?;
        drop(guard);

        self.transaction(transaction_id, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn stored(kind: TransactionKind) -> Transaction {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Transaction {
            id: Uuid::new_v4(),
            owner_id: "alice".to_string(),
            account_id: Uuid::new_v4(),
            counter_account_id: (kind == TransactionKind::Transfer).then(Uuid::new_v4),
            category_id: Some(Uuid::new_v4()),
            kind,
            amount_minor: 3_000,
            description: "rent".to_string(),
            occurred_at: at,
            tags: Vec::new(),
            notes: Some("march".to_string()),
            recurrence: None,
            idempotency_key: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn staging_keeps_untouched_fields() {
        let existing = stored(TransactionKind::Expense);
        let now = Utc.timestamp_opt(1_700_100_000, 0).unwrap();
        let cmd = UpdateTransactionCmd::new("alice", existing.id)
            .amount_minor(4_500)
            .description("  rent april ")
            .notes(None);

        let staged = stage_update(&existing, &cmd, None, now);
        assert_eq!(staged.amount_minor, 4_500);
        assert_eq!(staged.description, "rent april");
        assert_eq!(staged.notes, None);
        assert_eq!(staged.account_id, existing.account_id);
        assert_eq!(staged.category_id, existing.category_id);
        assert_eq!(staged.created_at, existing.created_at);
        assert_eq!(staged.updated_at, now);
    }

    #[test]
    fn leaving_transfer_drops_the_destination() {
        let existing = stored(TransactionKind::Transfer);
        let cmd = UpdateTransactionCmd::new("alice", existing.id).kind(TransactionKind::Expense);

        let staged = stage_update(&existing, &cmd, None, existing.updated_at);
        assert_eq!(staged.counter_account_id, None);
        assert!(staged.validate().is_ok());
    }

    #[test]
    fn transfer_keeps_destination_unless_replaced() {
        let existing = stored(TransactionKind::Transfer);
        let cmd = UpdateTransactionCmd::new("alice", existing.id).amount_minor(10);
        let staged = stage_update(&existing, &cmd, None, existing.updated_at);
        assert_eq!(staged.counter_account_id, existing.counter_account_id);

        let other = Uuid::new_v4();
        let cmd = UpdateTransactionCmd::new("alice", existing.id).counter_account_id(Some(other));
        let staged = stage_update(&existing, &cmd, None, existing.updated_at);
        assert_eq!(staged.counter_account_id, Some(other));
    }

    #[test]
    fn becoming_a_transfer_needs_a_destination() {
        let existing = stored(TransactionKind::Income);
        let cmd = UpdateTransactionCmd::new("alice", existing.id).kind(TransactionKind::Transfer);

        let staged = stage_update(&existing, &cmd, None, existing.updated_at);
        assert!(staged.validate().is_err());
    }
}
