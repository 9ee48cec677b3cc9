//! Command structs for engine operations.
//!
//! These types group parameters for write operations
//! (create/update of transactions, accounts and categories), keeping call
//! sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{AccountKind, CategoryKind, Currency, Recurrence, TransactionKind};

/// Create a transaction.
#[derive(Clone, Debug)]
pub struct CreateTransactionCmd {
    pub user_id: String,
    pub account_id: Uuid,
    pub counter_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub recurrence: Option<Recurrence>,
    pub idempotency_key: Option<String>,
}

impl CreateTransactionCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        account_id: Uuid,
        kind: TransactionKind,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            account_id,
            counter_account_id: None,
            category_id: None,
            kind,
            amount_minor,
            description: String::new(),
            occurred_at,
            tags: Vec::new(),
            notes: None,
            recurrence: None,
            idempotency_key: None,
        }
    }

    #[must_use]
    pub fn income(
        user_id: impl Into<String>,
        account_id: Uuid,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            user_id,
            account_id,
            TransactionKind::Income,
            amount_minor,
            occurred_at,
        )
    }

    #[must_use]
    pub fn expense(
        user_id: impl Into<String>,
        account_id: Uuid,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            user_id,
            account_id,
            TransactionKind::Expense,
            amount_minor,
            occurred_at,
        )
    }

    #[must_use]
    pub fn transfer(
        user_id: impl Into<String>,
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        let mut cmd = Self::new(
            user_id,
            from_account_id,
            TransactionKind::Transfer,
            amount_minor,
            occurred_at,
        );
        cmd.counter_account_id = Some(to_account_id);
        cmd
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Update an existing transaction.
///
/// Every field but the identifiers is optional; `None` keeps the stored
/// value. Nullable references use a nested `Option`: `Some(None)` clears them.
#[derive(Clone, Debug, Default)]
pub struct UpdateTransactionCmd {
    pub user_id: String,
    pub transaction_id: Uuid,
    pub account_id: Option<Uuid>,
    pub counter_account_id: Option<Option<Uuid>>,
    pub category_id: Option<Option<Uuid>>,
    pub kind: Option<TransactionKind>,
    pub amount_minor: Option<i64>,
    pub description: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<Option<String>>,
    pub recurrence: Option<Option<Recurrence>>,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, transaction_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            transaction_id,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn counter_account_id(mut self, counter_account_id: Option<Uuid>) -> Self {
        self.counter_account_id = Some(counter_account_id);
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Option<Uuid>) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }

    #[must_use]
    pub fn recurrence(mut self, recurrence: Option<Recurrence>) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    /// Whether the request can change any balance.
    pub(crate) fn touches_balances(&self) -> bool {
        self.account_id.is_some()
            || self.counter_account_id.is_some()
            || self.kind.is_some()
            || self.amount_minor.is_some()
    }

    pub(crate) fn is_empty(&self) -> bool {
        !self.touches_balances()
            && self.category_id.is_none()
            && self.description.is_none()
            && self.occurred_at.is_none()
            && self.tags.is_none()
            && self.notes.is_none()
            && self.recurrence.is_none()
    }
}

/// Open a new account.
#[derive(Clone, Debug)]
pub struct NewAccountCmd {
    pub user_id: String,
    pub name: String,
    pub kind: AccountKind,
    pub currency: Currency,
    /// Posted as an opening income (positive) or expense (negative).
    pub opening_balance_minor: i64,
}

impl NewAccountCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            kind,
            currency: Currency::default(),
            opening_balance_minor: 0,
        }
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    #[must_use]
    pub fn opening_balance(mut self, balance_minor: i64) -> Self {
        self.opening_balance_minor = balance_minor;
        self
    }
}

/// Create a category.
#[derive(Clone, Debug)]
pub struct NewCategoryCmd {
    pub user_id: String,
    pub name: String,
    pub kind: CategoryKind,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl NewCategoryCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, kind: CategoryKind) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            kind,
            color: None,
            icon: None,
        }
    }

    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}
