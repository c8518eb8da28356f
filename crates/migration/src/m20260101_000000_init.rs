//! Initial schema.
//!
//! - `users`: credentials and profile
//! - `definitions`: shared catalog of holdable units
//! - `accounts`: cash containers owned by a user
//! - `assets`: holdings inside an account, each pointing at a definition
//! - `transactions`: dated money movements on an account
//!
//! Decimal amounts are TEXT so they keep their exact scale.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Definitions {
    Table,
    Id,
    Name,
    Abbreviation,
    AbbreviationKey,
    NameKey,
    Suffix,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    UserId,
    Name,
    Kind,
    Balance,
    Currency,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Assets {
    Table,
    Id,
    UserId,
    AccountId,
    DefinitionId,
    Kind,
    Quantity,
    PurchasePrice,
    CurrentPrice,
    Notes,
    PurchaseDate,
    LastUpdated,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    UserId,
    AccountId,
    AssetId,
    Kind,
    Amount,
    Quantity,
    Price,
    Fee,
    Currency,
    Description,
    Category,
    Date,
    ToAccountId,
    TransactionHash,
    CreatedAt,
    UpdatedAt,
}

fn id_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).string().not_null().primary_key().to_owned()
}

fn text_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).string().not_null().to_owned()
}

fn timestamp_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(id_col(Users::Id))
                    .col(text_col(Users::Email).unique_key().to_owned())
                    .col(text_col(Users::PasswordHash))
                    .col(text_col(Users::FirstName))
                    .col(ColumnDef::new(Users::LastName).string().not_null().default(""))
                    .col(timestamp_col(Users::CreatedAt))
                    .col(timestamp_col(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Definitions::Table)
                    .if_not_exists()
                    .col(id_col(Definitions::Id))
                    .col(text_col(Definitions::Name))
                    .col(text_col(Definitions::Abbreviation))
                    .col(text_col(Definitions::AbbreviationKey))
                    .col(text_col(Definitions::NameKey))
                    .col(ColumnDef::new(Definitions::Suffix).string().not_null().default(""))
                    .col(timestamp_col(Definitions::CreatedAt))
                    .col(timestamp_col(Definitions::UpdatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-definitions-abbreviation_key-unique")
                    .table(Definitions::Table)
                    .col(Definitions::AbbreviationKey)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-definitions-name")
                    .table(Definitions::Table)
                    .col(Definitions::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(id_col(Accounts::Id))
                    .col(text_col(Accounts::UserId))
                    .col(text_col(Accounts::Name))
                    .col(text_col(Accounts::Kind))
                    .col(ColumnDef::new(Accounts::Balance).string().not_null().default("0"))
                    .col(text_col(Accounts::Currency))
                    .col(timestamp_col(Accounts::CreatedAt))
                    .col(timestamp_col(Accounts::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounts-user_id")
                            .from(Accounts::Table, Accounts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-user_id-kind")
                    .table(Accounts::Table)
                    .col(Accounts::UserId)
                    .col(Accounts::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Assets::Table)
                    .if_not_exists()
                    .col(id_col(Assets::Id))
                    .col(text_col(Assets::UserId))
                    .col(text_col(Assets::AccountId))
                    .col(text_col(Assets::DefinitionId))
                    .col(text_col(Assets::Kind))
                    .col(text_col(Assets::Quantity))
                    .col(text_col(Assets::PurchasePrice))
                    .col(text_col(Assets::CurrentPrice))
                    .col(ColumnDef::new(Assets::Notes).string())
                    .col(timestamp_col(Assets::PurchaseDate))
                    .col(timestamp_col(Assets::LastUpdated))
                    .col(timestamp_col(Assets::CreatedAt))
                    .col(timestamp_col(Assets::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-assets-account_id")
                            .from(Assets::Table, Assets::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-assets-definition_id")
                            .from(Assets::Table, Assets::DefinitionId)
                            .to(Definitions::Table, Definitions::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-assets-account_id")
                    .table(Assets::Table)
                    .col(Assets::AccountId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-assets-user_id-purchase_date")
                    .table(Assets::Table)
                    .col(Assets::UserId)
                    .col(Assets::PurchaseDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(id_col(Transactions::Id))
                    .col(text_col(Transactions::UserId))
                    .col(text_col(Transactions::AccountId))
                    .col(ColumnDef::new(Transactions::AssetId).string())
                    .col(text_col(Transactions::Kind))
                    .col(text_col(Transactions::Amount))
                    .col(ColumnDef::new(Transactions::Quantity).string().not_null().default("0"))
                    .col(ColumnDef::new(Transactions::Price).string().not_null().default("0"))
                    .col(ColumnDef::new(Transactions::Fee).string().not_null().default("0"))
                    .col(text_col(Transactions::Currency))
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(ColumnDef::new(Transactions::Category).string())
                    .col(timestamp_col(Transactions::Date))
                    .col(ColumnDef::new(Transactions::ToAccountId).string())
                    .col(ColumnDef::new(Transactions::TransactionHash).string())
                    .col(timestamp_col(Transactions::CreatedAt))
                    .col(timestamp_col(Transactions::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-account_id")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-to_account_id")
                            .from(Transactions::Table, Transactions::ToAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-asset_id")
                            .from(Transactions::Table, Transactions::AssetId)
                            .to(Assets::Table, Assets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user_id-date")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::Date)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-account_id")
                    .table(Transactions::Table)
                    .col(Transactions::AccountId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Assets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Definitions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}
