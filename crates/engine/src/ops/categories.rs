use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Category, EngineError, NewCategoryCmd, ResultEngine, categories,
    util::{name_key, normalize_optional_text, normalize_required_name},
};

use super::{Engine, with_tx};

impl Engine {
    /// Creates a category. Names are unique per owner and kind after case
    /// folding, enforced by a unique index as well.
    pub async fn new_category(&self, cmd: NewCategoryCmd) -> ResultEngine<Uuid> {
        let name = normalize_required_name(&cmd.name, "category_name")?;
        let category = Category {
            id: Uuid::new_v4(),
            owner_id: cmd.user_id,
            name,
            kind: cmd.kind,
            color: normalize_optional_text(cmd.color.as_deref()),
            icon: normalize_optional_text(cmd.icon.as_deref()),
            active: true,
            created_at: Utc::now(),
        };

        with_tx!(self, |db_tx| {
            let exists = categories::Entity::find()
                .filter(categories::Column::OwnerId.eq(category.owner_id.as_str()))
                .filter(categories::Column::Kind.eq(category.kind.as_str()))
                .filter(categories::Column::NameNorm.eq(name_key(&category.name)))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(category.name.clone()));
            }

            categories::ActiveModel::from(&category)
                .insert(&db_tx)
                .await
                .map_err(|err| EngineError::existing_on_conflict(err, category.name.as_str()))?;
            Ok(category.id)
        })
    }

    pub async fn category(&self, category_id: Uuid, user_id: &str) -> ResultEngine<Category> {
        self.owned_category(&self.database, user_id, category_id)
            .await
    }

    pub async fn categories(
        &self,
        user_id: &str,
        include_inactive: bool,
    ) -> ResultEngine<Vec<Category>> {
        let mut query = categories::Entity::find().filter(categories::Column::OwnerId.eq(user_id));
        if !include_inactive {
            query = query.filter(categories::Column::Active.eq(true));
        }
        query
            .order_by_asc(categories::Column::Kind)
            .order_by_asc(categories::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Category::try_from)
            .collect()
    }

    /// Activates/deactivates a category. Transactions already labeled keep
    /// their reference.
    pub async fn set_category_active(
        &self,
        category_id: Uuid,
        active: bool,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.owned_category(&db_tx, user_id, category_id).await?;
            let model = categories::ActiveModel {
                id: ActiveValue::Set(category_id.to_string()),
                active: ActiveValue::Set(active),
                ..Default::default()
            };
            model.update(&db_tx).await?;
            Ok(())
        })
    }
}
