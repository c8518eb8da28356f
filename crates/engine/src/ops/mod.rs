use sea_orm::{DatabaseConnection, DbErr, SqlErr};

use crate::{EngineError, ResultEngine};

mod access;
mod accounts;
mod assets;
mod definitions;
mod summary;
mod transactions;
mod users;

pub use accounts::{AccountWithAssets, Holding};
pub use assets::AssetPerformance;
pub use summary::{AccountSummary, MonthlyTotal, TotalsGroup, TypeTotal};

/// Run a block inside a DB transaction, committing on success and rolling back
/// on error.
///
/// The whole unit of work races the cancellation signal of `$caller` (a
/// `Caller` or a bare `CancelSignal`); when it fires, the transaction is
/// dropped (rolled back) and `Aborted` is returned.
macro_rules! with_tx {
    ($self:expr, $caller:expr, |$tx:ident| $body:expr) => {{
        let signal: &$crate::CancelSignal = ::std::convert::AsRef::as_ref(&$caller);
        $crate::cancel::guard(signal, async {
            let $tx = $self.database.begin().await?;
            let result: $crate::ResultEngine<_> = $body;
            match result {
                Ok(value) => {
                    $tx.commit().await?;
                    Ok(value)
                }
                Err(err) => Err(err),
            }
        })
        .await
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Unique indexes are the final authority on natural keys; a concurrent
/// insert that slips past a pre-check surfaces here as `ExistingKey(key)`.
fn map_unique_violation(err: DbErr, key: &str) -> EngineError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => EngineError::ExistingKey(key.to_string()),
        _ => EngineError::Database(err),
    }
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use migration::MigratorTrait;
    use sea_orm::{ActiveModelTrait, Database};
    use uuid::Uuid;

    use super::*;
    use crate::{User, users};

    fn user(email: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn unique_violations_become_existing_key() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();

        users::ActiveModel::from_user(&user("a@example.com"), "hash".to_string())
            .insert(&db)
            .await
            .unwrap();
        let err = users::ActiveModel::from_user(&user("a@example.com"), "hash".to_string())
            .insert(&db)
            .await
            .unwrap_err();

        assert_eq!(
            map_unique_violation(err, "a@example.com"),
            EngineError::ExistingKey("a@example.com".to_string())
        );
    }

    #[test]
    fn other_database_errors_pass_through() {
        let err = map_unique_violation(DbErr::Custom("disk full".to_string()), "key");
        assert!(matches!(err, EngineError::Database(DbErr::Custom(_))));
    }
}
