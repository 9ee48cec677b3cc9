use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{
    Account, Category, CategoryLabel, EngineError, ResultEngine, Transaction, TransactionKind,
    TransactionView, accounts, categories, transactions, util::to_epoch,
};

use super::super::Engine;

const DEFAULT_LIMIT: u64 = 100;
const MAX_LIMIT: u64 = 1_000;

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    /// Matches either side of a transfer.
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<TransactionKind>>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Defaults to 100, capped at 1000.
    pub limit: Option<u64>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::invalid("range", "from must be < to"));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::invalid("kinds", "must not be empty"));
    }
    if filter.limit == Some(0) {
        return Err(EngineError::invalid("limit", "must be > 0"));
    }
    Ok(())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(account_id) = filter.account_id {
            self = self.filter(
                Condition::any()
                    .add(transactions::Column::AccountId.eq(account_id.to_string()))
                    .add(transactions::Column::CounterAccountId.eq(account_id.to_string())),
            );
        }
        if let Some(category_id) = filter.category_id {
            self = self.filter(transactions::Column::CategoryId.eq(category_id.to_string()));
        }
        if let Some(kinds) = &filter.kinds {
            let kinds: Vec<String> = kinds.iter().map(|k| k.as_str().to_string()).collect();
            self = self.filter(transactions::Column::Kind.is_in(kinds));
        }
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::OccurredAt.gte(to_epoch(from)));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::OccurredAt.lt(to_epoch(to)));
        }
        self
    }
}

impl Engine {
    /// Lists transactions of `user_id`, newest first, joined with display
    /// fields. Read-only: listing never touches balances.
    pub async fn transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<TransactionView>> {
        validate_list_filter(filter)?;
        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

        let models = transactions::Entity::find()
            .filter(transactions::Column::OwnerId.eq(user_id))
            .apply_tx_filters(filter)
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .limit(limit)
            .all(&self.database)
            .await?;

        let accounts_by_id: HashMap<Uuid, Account> = accounts::Entity::find()
            .filter(accounts::Column::OwnerId.eq(user_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|model| Account::try_from(model).map(|a| (a.id, a)))
            .collect::<ResultEngine<_>>()?;
        let categories_by_id: HashMap<Uuid, Category> = categories::Entity::find()
            .filter(categories::Column::OwnerId.eq(user_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|model| Category::try_from(model).map(|c| (c.id, c)))
            .collect::<ResultEngine<_>>()?;

        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let tx = Transaction::try_from(model)?;
            let account = accounts_by_id
                .get(&tx.account_id)
                .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
            let counter_account_name = tx
                .counter_account_id
                .and_then(|id| accounts_by_id.get(&id))
                .map(|a| a.name.clone());
            let category = tx
                .category_id
                .and_then(|id| categories_by_id.get(&id))
                .cloned()
                .map(CategoryLabel::from);

            out.push(TransactionView {
                account_name: account.name.clone(),
                account_kind: account.kind,
                counter_account_name,
                category,
                transaction: tx,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn filter_rejects_inverted_range_and_empty_kinds() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let inverted = TransactionListFilter {
            from: Some(at),
            to: Some(at),
            ..Default::default()
        };
        assert_eq!(
            validate_list_filter(&inverted),
            Err(EngineError::invalid("range", "from must be < to"))
        );

        let no_kinds = TransactionListFilter {
            kinds: Some(Vec::new()),
            ..Default::default()
        };
        assert!(validate_list_filter(&no_kinds).is_err());

        let zero = TransactionListFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert!(validate_list_filter(&zero).is_err());

        assert!(validate_list_filter(&TransactionListFilter::default()).is_ok());
    }
}
