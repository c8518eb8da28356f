use sea_orm::{DatabaseTransaction, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, accounts, assets, definitions, transactions, users};

use super::Engine;

/// Generates a `require_*` lookup for a user-owned entity.
///
/// A missing row is `KeyNotFound`; a row owned by someone else is `Forbidden`.
/// The row is never handed back to a caller who does not own it.
macro_rules! impl_owned_lookup {
    ($require_fn:ident, $entity:path, $model:path, $label:literal) => {
        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            id: Uuid,
            user_id: &str,
        ) -> ResultEngine<$model> {
            let model = <$entity>::find_by_id(id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("{} {id}", $label)))?;
            if model.user_id != user_id {
                return Err(EngineError::Forbidden(format!(
                    "{} belongs to another user",
                    $label
                )));
            }
            Ok(model)
        }
    };
}

impl Engine {
    impl_owned_lookup!(require_account, accounts::Entity, accounts::Model, "account");

    impl_owned_lookup!(require_asset, assets::Entity, assets::Model, "asset");

    impl_owned_lookup!(
        require_transaction,
        transactions::Entity,
        transactions::Model,
        "transaction"
    );

    pub(super) async fn require_definition(
        &self,
        db: &DatabaseTransaction,
        definition_id: Uuid,
    ) -> ResultEngine<definitions::Model> {
        definitions::Entity::find_by_id(definition_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("definition {definition_id}")))
    }

    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {user_id}")))
    }
}
