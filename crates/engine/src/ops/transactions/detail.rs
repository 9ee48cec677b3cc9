use uuid::Uuid;

use crate::{ResultEngine, TransactionView};

use super::super::Engine;

impl Engine {
    /// Returns a single transaction joined with its account and category
    /// display fields.
    pub async fn transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<TransactionView> {
        let tx = self
            .owned_transaction(&self.database, user_id, transaction_id)
            .await?;
        self.view_of(&self.database, tx).await
    }
}
