#![allow(dead_code)]

use engine::{
    AccountNew, AccountType, Caller, CancelSignal, DefinitionNew, Engine, UserNew, cancel_pair,
};
use migration::MigratorTrait;
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

pub struct Fixture {
    pub engine: Engine,
    pub db: DatabaseConnection,
    pub alice: Caller,
    pub bob: Caller,
}

pub async fn engine_with_db() -> Fixture {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    let alice = register(&engine, "alice@example.com").await;
    let bob = register(&engine, "bob@example.com").await;
    Fixture {
        engine,
        db,
        alice,
        bob,
    }
}

pub async fn register(engine: &Engine, email: &str) -> Caller {
    let user = engine
        .register(
            &CancelSignal::never(),
            UserNew {
                email: email.to_string(),
                password: "password123".to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
            },
        )
        .await
        .unwrap();
    Caller::new(user.id.to_string())
}

pub async fn open_account(engine: &Engine, caller: &Caller, name: &str, balance: Decimal) -> Uuid {
    engine
        .new_account(
            caller,
            AccountNew {
                name: name.to_string(),
                kind: AccountType::BankAccount,
                balance,
                currency: "eur".to_string(),
            },
        )
        .await
        .unwrap()
        .id
}

pub async fn add_definition(engine: &Engine, caller: &Caller, name: &str, abbreviation: &str) -> Uuid {
    engine
        .new_definition(
            caller,
            DefinitionNew {
                name: name.to_string(),
                abbreviation: abbreviation.to_string(),
                suffix: abbreviation.to_uppercase(),
            },
        )
        .await
        .unwrap()
        .id
}

/// A caller whose request was already abandoned.
pub fn cancelled(caller: &Caller) -> Caller {
    let (handle, signal) = cancel_pair();
    handle.cancel();
    caller.clone().with_cancel(signal)
}
