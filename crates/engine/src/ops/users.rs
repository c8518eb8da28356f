use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    CancelSignal, Caller, EngineError, ResultEngine, User, UserNew, UserUpdate, accounts, assets,
    transactions,
    users::{self, ensure_password_strength, hash_password, normalize_email, verify_password},
};

use super::{Engine, map_unique_violation, normalize_required_name, with_tx};

const BAD_CREDENTIALS: &str = "invalid email or password";

impl Engine {
    async fn email_taken(
        &self,
        db: &DatabaseTransaction,
        email: &str,
        except: Option<&str>,
    ) -> ResultEngine<bool> {
        let mut query = users::Entity::find().filter(users::Column::Email.eq(email));
        if let Some(id) = except {
            query = query.filter(users::Column::Id.ne(id));
        }
        Ok(query.one(db).await?.is_some())
    }

    /// Checks `password` against the caller's stored hash.
    async fn check_password(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        password: &str,
    ) -> ResultEngine<users::Model> {
        let model = self.require_user(db, user_id).await?;
        if !verify_password(password, &model.password_hash)? {
            return Err(EngineError::Unauthorized("wrong password".to_string()));
        }
        Ok(model)
    }

    /// Creates a user. Emails are unique after trimming and lower-casing.
    pub async fn register(&self, cancel: &CancelSignal, cmd: UserNew) -> ResultEngine<User> {
        let email = normalize_email(&cmd.email)?;
        ensure_password_strength(&cmd.password)?;
        let first_name = normalize_required_name(&cmd.first_name, "first name")?;
        let last_name = cmd.last_name.trim().to_string();
        let password_hash = hash_password(&cmd.password)?;

        with_tx!(self, cancel, |db_tx| {
            if self.email_taken(&db_tx, &email, None).await? {
                return Err(EngineError::ExistingKey(email));
            }
            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                email,
                first_name,
                last_name,
                created_at: now,
                updated_at: now,
            };
            users::ActiveModel::from_user(&user, password_hash)
                .insert(&db_tx)
                .await
                .map_err(|err| map_unique_violation(err, &user.email))?;
            tracing::info!(user_id = %user.id, "user registered");
            Ok(user)
        })
    }

    /// Resolves credentials to a user. An unknown email and a wrong password
    /// fail the same way.
    pub async fn login(
        &self,
        cancel: &CancelSignal,
        email: &str,
        password: &str,
    ) -> ResultEngine<User> {
        let unauthorized = || EngineError::Unauthorized(BAD_CREDENTIALS.to_string());
        let email = normalize_email(email).map_err(|_| unauthorized())?;
        with_tx!(self, cancel, |db_tx| {
            let model = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
                .ok_or_else(unauthorized)?;
            if !verify_password(password, &model.password_hash)? {
                return Err(unauthorized());
            }
            User::try_from(model)
        })
    }

    /// The caller's own profile.
    pub async fn user(&self, caller: &Caller) -> ResultEngine<User> {
        with_tx!(self, caller, |db_tx| {
            let model = self.require_user(&db_tx, &caller.user_id).await?;
            User::try_from(model)
        })
    }

    pub async fn update_user(&self, caller: &Caller, cmd: UserUpdate) -> ResultEngine<User> {
        let email = cmd.email.as_deref().map(normalize_email).transpose()?;
        let first_name = cmd
            .first_name
            .as_deref()
            .map(|n| normalize_required_name(n, "first name"))
            .transpose()?;

        with_tx!(self, caller, |db_tx| {
            let model = self.require_user(&db_tx, &caller.user_id).await?;
            let password_hash = model.password_hash.clone();
            let mut user = User::try_from(model)?;
            if let Some(email) = email {
                if self
                    .email_taken(&db_tx, &email, Some(&caller.user_id))
                    .await?
                {
                    return Err(EngineError::ExistingKey(email));
                }
                user.email = email;
            }
            if let Some(first_name) = first_name {
                user.first_name = first_name;
            }
            if let Some(last_name) = cmd.last_name.as_deref() {
                user.last_name = last_name.trim().to_string();
            }
            user.updated_at = Utc::now();
            users::ActiveModel::from_user(&user, password_hash)
                .update(&db_tx)
                .await
                .map_err(|err| map_unique_violation(err, &user.email))?;
            Ok(user)
        })
    }

    /// Replaces the password once the current one is confirmed.
    pub async fn change_password(
        &self,
        caller: &Caller,
        current: &str,
        new_password: &str,
    ) -> ResultEngine<()> {
        ensure_password_strength(new_password)?;
        let password_hash = hash_password(new_password)?;
        with_tx!(self, caller, |db_tx| {
            let model = self
                .check_password(&db_tx, &caller.user_id, current)
                .await?;
            let user = User::try_from(model)?;
            let mut active = users::ActiveModel::from_user(&user, password_hash);
            active.updated_at = sea_orm::ActiveValue::Set(Utc::now());
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// `true` when `password` matches the caller's stored one.
    pub async fn validate_password(&self, caller: &Caller, password: &str) -> ResultEngine<bool> {
        with_tx!(self, caller, |db_tx| {
            let model = self.require_user(&db_tx, &caller.user_id).await?;
            verify_password(password, &model.password_hash)
        })
    }

    /// Removes the caller and everything they own, after confirming the
    /// password. All of it goes in one transaction.
    pub async fn delete_user(&self, caller: &Caller, password: &str) -> ResultEngine<()> {
        with_tx!(self, caller, |db_tx| {
            self.check_password(&db_tx, &caller.user_id, password)
                .await?;

            let account_ids: Vec<String> = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(caller.user_id.clone()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|account| account.id)
                .collect();
            for account_id in &account_ids {
                self.purge_account(&db_tx, account_id).await?;
            }

            transactions::Entity::delete_many()
                .filter(transactions::Column::UserId.eq(caller.user_id.clone()))
                .exec(&db_tx)
                .await?;
            assets::Entity::delete_many()
                .filter(assets::Column::UserId.eq(caller.user_id.clone()))
                .exec(&db_tx)
                .await?;
            users::Entity::delete_by_id(caller.user_id.clone())
                .exec(&db_tx)
                .await?;
            tracing::info!(
                user_id = %caller.user_id,
                accounts = account_ids.len(),
                "user deleted"
            );
            Ok(())
        })
    }
}
