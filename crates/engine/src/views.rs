//! Read-side shapes returned to callers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AccountKind, Category, Transaction};

/// Display fields of a category attached to a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLabel {
    pub id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl From<Category> for CategoryLabel {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            color: category.color,
            icon: category.icon,
        }
    }
}

/// A transaction joined with the display fields of what it references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionView {
    pub transaction: Transaction,
    pub account_name: String,
    pub account_kind: AccountKind,
    /// Destination account name for transfers.
    pub counter_account_name: Option<String>,
    pub category: Option<CategoryLabel>,
}

/// An account whose stored balance differs from the sum of its transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDrift {
    pub account_id: Uuid,
    pub stored_minor: i64,
    pub expected_minor: i64,
}

impl BalanceDrift {
    /// Amount the stored balance is off by.
    #[must_use]
    pub fn difference(&self) -> i64 {
        self.stored_minor - self.expected_minor
    }
}
