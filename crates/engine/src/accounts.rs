//! The module contains `Account` struct and its implementation.

use chrono::{DateTime, Utc};

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Currency, EngineError, ResultEngine,
    util::{from_epoch, model_currency, name_key, parse_uuid, to_epoch},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Checking,
    Savings,
    Credit,
    Investment,
    Cash,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
            Self::Credit => "credit",
            Self::Investment => "investment",
            Self::Cash => "cash",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "checking" => Ok(Self::Checking),
            "savings" => Ok(Self::Savings),
            "credit" => Ok(Self::Credit),
            "investment" => Ok(Self::Investment),
            "cash" => Ok(Self::Cash),
            other => Err(EngineError::invalid(
                "account_kind",
                format!("invalid account kind: {other}"),
            )),
        }
    }
}

/// An account.
///
/// An account is anywhere money is kept: a bank account, a credit card, a
/// brokerage account or the cash in a drawer. Its balance is denormalized from
/// the transactions referencing it and is only ever moved by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub kind: AccountKind,
    pub balance_minor: i64,
    pub currency: Currency,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// A fresh account always starts at zero; opening balances are posted as
    /// transactions.
    pub fn new(
        owner_id: String,
        name: String,
        kind: AccountKind,
        currency: Currency,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            kind,
            balance_minor: 0,
            currency,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub name_norm: String,
    pub kind: String,
    pub balance_minor: i64,
    pub currency: String,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            owner_id: ActiveValue::Set(value.owner_id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            name_norm: ActiveValue::Set(name_key(&value.name)),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            balance_minor: ActiveValue::Set(value.balance_minor),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            active: ActiveValue::Set(value.active),
            created_at: ActiveValue::Set(to_epoch(value.created_at)),
            updated_at: ActiveValue::Set(to_epoch(value.updated_at)),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "account_id")?,
            owner_id: model.owner_id,
            name: model.name,
            kind: AccountKind::try_from(model.kind.as_str())?,
            balance_minor: model.balance_minor,
            currency: model_currency(&model.currency)?,
            active: model.active,
            created_at: from_epoch(model.created_at, "created_at")?,
            updated_at: from_epoch(model.updated_at, "updated_at")?,
        })
    }
}
