//! Ledger engine.
//!
//! Owns the domain types (accounts, assets, the definitions catalog,
//! transactions and users), their SQLite mapping through sea-orm, and every
//! operation the HTTP layer exposes. Every operation runs in a single DB
//! transaction scoped to a [`Caller`].

pub use accounts::{Account, AccountType};
pub use assets::{Asset, AssetType};
pub use cancel::{CancelHandle, CancelSignal, Caller, cancel_pair};
pub use commands::{
    AccountFilter, AccountNew, AccountUpdate, AssetFilter, AssetNew, AssetUpdate, DateRange,
    DefinitionNew, Page, UserNew, UserUpdate,
};
pub use definitions::Definition;
pub use error::EngineError;
pub use ops::{
    AccountSummary, AccountWithAssets, AssetPerformance, Engine, EngineBuilder, Holding,
    MonthlyTotal, TotalsGroup, TypeTotal,
};
pub use transactions::{Transaction, TransactionFields, TransactionType};
pub use users::User;

mod accounts;
mod assets;
mod cancel;
mod commands;
mod definitions;
mod error;
mod ops;
mod transactions;
mod users;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
