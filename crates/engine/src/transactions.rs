//! Transaction primitives.
//!
//! A `Transaction` is a single posting against an account. Its signed
//! contribution to balances (its effects) is derived from kind and amount;
//! the amount itself is always stored positive.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    tags::{decode_tags, encode_tags},
    util::{ensure_positive_amount, from_epoch, parse_uuid, to_epoch},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
    /// Moves money from the owning account to the counter account.
    Transfer,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            other => Err(EngineError::invalid(
                "kind",
                format!("invalid transaction kind: {other}"),
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl TryFrom<&str> for Frequency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::invalid(
                "recurrence_frequency",
                format!("invalid frequency: {other}"),
            )),
        }
    }
}

/// Informational recurrence metadata. The ledger never expands it into
/// future transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub frequency: Frequency,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub owner_id: String,
    pub account_id: Uuid,
    /// Destination account, set only for transfers.
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Checks the rules every stored transaction satisfies.
    pub fn validate(&self) -> ResultEngine<()> {
        ensure_positive_amount(self.amount_minor)?;
        match (self.kind, self.counter_account_id) {
            (TransactionKind::Transfer, None) => {
                return Err(EngineError::invalid(
                    "counter_account_id",
                    "a transfer requires a destination account",
                ));
            }
            (TransactionKind::Transfer, Some(counter)) if counter == self.account_id => {
                return Err(EngineError::invalid(
                    "counter_account_id",
                    "source and destination accounts must differ",
                ));
            }
            (TransactionKind::Income | TransactionKind::Expense, Some(_)) => {
                return Err(EngineError::invalid(
                    "counter_account_id",
                    format!("not allowed on {} transactions", self.kind.as_str()),
                ));
            }
            _ => {}
        }
        if let Some(Recurrence { end: Some(end), .. }) = self.recurrence
            && end < self.occurred_at
        {
            return Err(EngineError::invalid(
                "recurrence_end",
                "must not precede the transaction date",
            ));
        }
        Ok(())
    }

    /// Signed balance contribution per referenced account.
    pub fn effects(&self) -> Vec<(Uuid, i64)> {
        match self.kind {
            TransactionKind::Income => vec![(self.account_id, self.amount_minor)],
            TransactionKind::Expense => vec![(self.account_id, -self.amount_minor)],
            TransactionKind::Transfer => {
                let mut effects = vec![(self.account_id, -self.amount_minor)];
                if let Some(counter) = self.counter_account_id {
                    effects.push((counter, self.amount_minor));
                }
                effects
            }
        }
    }

    /// Every account whose balance this transaction contributes to.
    pub fn account_ids(&self) -> Vec<Uuid> {
        self.effects().into_iter().map(|(id, _)| id).collect()
    }
}

/// Reverse `old` effects and apply `new` ones, coalesced into one relative
/// adjustment per account.
///
/// The result is ordered by account id and omits accounts whose net change is
/// zero.
pub(crate) fn net_adjustments(old: &[(Uuid, i64)], new: &[(Uuid, i64)]) -> Vec<(Uuid, i64)> {
    let mut net: BTreeMap<Uuid, i64> = BTreeMap::new();
    for (account_id, delta) in old {
        *net.entry(*account_id).or_default() -= delta;
    }
    for (account_id, delta) in new {
        *net.entry(*account_id).or_default() += delta;
    }
    net.into_iter().filter(|(_, delta)| *delta != 0).collect()
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub account_id: String,
    pub counter_account_id: Option<String>,
    pub category_id: Option<String>,
    pub kind: String,
    pub amount_minor: i64,
    pub description: String,
    pub occurred_at: i64,
    pub tags: String,
    pub notes: Option<String>,
    pub is_recurring: bool,
    pub recurrence_frequency: Option<String>,
    pub recurrence_end: Option<i64>,
    pub idempotency_key: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Account,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Category,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&Transaction> for ActiveModel {
    type Error = EngineError;

    fn try_from(tx: &Transaction) -> ResultEngine<Self> {
        Ok(Self {
            id: ActiveValue::Set(tx.id.to_string()),
            owner_id: ActiveValue::Set(tx.owner_id.clone()),
            account_id: ActiveValue::Set(tx.account_id.to_string()),
            counter_account_id: ActiveValue::Set(tx.counter_account_id.map(|id| id.to_string())),
            category_id: ActiveValue::Set(tx.category_id.map(|id| id.to_string())),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            description: ActiveValue::Set(tx.description.clone()),
            occurred_at: ActiveValue::Set(to_epoch(tx.occurred_at)),
            tags: ActiveValue::Set(encode_tags(&tx.tags)?),
            notes: ActiveValue::Set(tx.notes.clone()),
            is_recurring: ActiveValue::Set(tx.recurrence.is_some()),
            recurrence_frequency: ActiveValue::Set(
                tx.recurrence.map(|r| r.frequency.as_str().to_string()),
            ),
            recurrence_end: ActiveValue::Set(tx.recurrence.and_then(|r| r.end).map(to_epoch)),
            idempotency_key: ActiveValue::Set(tx.idempotency_key.clone()),
            created_at: ActiveValue::Set(to_epoch(tx.created_at)),
            updated_at: ActiveValue::Set(to_epoch(tx.updated_at)),
        })
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let recurrence = if model.is_recurring {
            let frequency = model.recurrence_frequency.as_deref().ok_or_else(|| {
                EngineError::invalid("recurrence_frequency", "missing for a recurring row")
            })?;
            Some(Recurrence {
                frequency: Frequency::try_from(frequency)?,
                end: model
                    .recurrence_end
                    .map(|secs| from_epoch(secs, "recurrence_end"))
                    .transpose()?,
            })
        } else {
            None
        };

        Ok(Self {
            id: parse_uuid(&model.id, "transaction_id")?,
            owner_id: model.owner_id,
            account_id: parse_uuid(&model.account_id, "account_id")?,
            counter_account_id: model
                .counter_account_id
                .as_deref()
                .map(|id| parse_uuid(id, "counter_account_id"))
                .transpose()?,
            category_id: model
                .category_id
                .as_deref()
                .map(|id| parse_uuid(id, "category_id"))
                .transpose()?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            description: model.description,
            occurred_at: from_epoch(model.occurred_at, "occurred_at")?,
            tags: decode_tags(&model.tags)?,
            notes: model.notes,
            recurrence,
            idempotency_key: model.idempotency_key,
            created_at: from_epoch(model.created_at, "created_at")?,
            updated_at: from_epoch(model.updated_at, "updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn tx(kind: TransactionKind, amount_minor: i64) -> Transaction {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Transaction {
            id: Uuid::new_v4(),
            owner_id: "alice".to_string(),
            account_id: Uuid::new_v4(),
            counter_account_id: None,
            category_id: None,
            kind,
            amount_minor,
            description: "groceries".to_string(),
            occurred_at: at,
            tags: vec!["food".to_string()],
            notes: None,
            recurrence: None,
            idempotency_key: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn effect_sign_follows_kind() {
        let income = tx(TransactionKind::Income, 200);
        assert_eq!(income.effects(), vec![(income.account_id, 200)]);

        let expense = tx(TransactionKind::Expense, 200);
        assert_eq!(expense.effects(), vec![(expense.account_id, -200)]);

        let mut transfer = tx(TransactionKind::Transfer, 75);
        let counter = Uuid::new_v4();
        transfer.counter_account_id = Some(counter);
        assert_eq!(
            transfer.effects(),
            vec![(transfer.account_id, -75), (counter, 75)]
        );
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        assert!(tx(TransactionKind::Income, 0).validate().is_err());

        let transfer = tx(TransactionKind::Transfer, 10);
        assert_eq!(
            transfer.validate(),
            Err(EngineError::invalid(
                "counter_account_id",
                "a transfer requires a destination account"
            ))
        );

        let mut self_transfer = tx(TransactionKind::Transfer, 10);
        self_transfer.counter_account_id = Some(self_transfer.account_id);
        assert!(self_transfer.validate().is_err());

        let mut expense = tx(TransactionKind::Expense, 10);
        expense.counter_account_id = Some(Uuid::new_v4());
        assert!(expense.validate().is_err());

        let mut recurring = tx(TransactionKind::Expense, 10);
        recurring.recurrence = Some(Recurrence {
            frequency: Frequency::Monthly,
            end: Some(recurring.occurred_at - chrono::Duration::days(1)),
        });
        assert!(recurring.validate().is_err());
    }

    #[test]
    fn net_adjustments_same_account_collapses_to_difference() {
        let account = Uuid::new_v4();
        // income 200 becomes expense 150 on the same account
        let net = net_adjustments(&[(account, 200)], &[(account, -150)]);
        assert_eq!(net, vec![(account, -350)]);

        assert!(net_adjustments(&[(account, -30)], &[(account, -30)]).is_empty());
    }

    #[test]
    fn net_adjustments_reassignment_touches_both_accounts() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let net = net_adjustments(&[(a, -30)], &[(b, -30)]);
        let mut expected = vec![(a, 30), (b, -30)];
        expected.sort();
        assert_eq!(net, expected);
    }

    #[test]
    fn model_round_trip_keeps_recurrence_and_tags() {
        let mut original = tx(TransactionKind::Expense, 1299);
        original.tags = vec!["b".to_string(), "a".to_string()];
        original.recurrence = Some(Recurrence {
            frequency: Frequency::Weekly,
            end: None,
        });
        let active = ActiveModel::try_from(&original).unwrap();
        let model = Model {
            id: active.id.unwrap(),
            owner_id: active.owner_id.unwrap(),
            account_id: active.account_id.unwrap(),
            counter_account_id: active.counter_account_id.unwrap(),
            category_id: active.category_id.unwrap(),
            kind: active.kind.unwrap(),
            amount_minor: active.amount_minor.unwrap(),
            description: active.description.unwrap(),
            occurred_at: active.occurred_at.unwrap(),
            tags: active.tags.unwrap(),
            notes: active.notes.unwrap(),
            is_recurring: active.is_recurring.unwrap(),
            recurrence_frequency: active.recurrence_frequency.unwrap(),
            recurrence_end: active.recurrence_end.unwrap(),
            idempotency_key: active.idempotency_key.unwrap(),
            created_at: active.created_at.unwrap(),
            updated_at: active.updated_at.unwrap(),
        };
        assert!(model.tags.starts_with("v1:"));
        assert_eq!(Transaction::try_from(model).unwrap(), original);
    }

    #[test]
    fn unknown_kind_names_the_field() {
        assert_eq!(
            TransactionKind::try_from("refund"),
            Err(EngineError::invalid("kind", "invalid transaction kind: refund"))
        );
    }
}
