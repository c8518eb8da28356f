use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{CancelSignal, Caller, DefinitionNew, Engine, EngineError, UserNew};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

mod catalog;

#[derive(Parser, Debug)]
#[command(name = "ledger_admin")]
#[command(about = "Admin utilities for the ledger (bootstrap users, seed definitions)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./ledger.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Definitions(Definitions),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Registers a user; the password is read from the terminal.
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    first_name: String,
    #[arg(long, default_value = "")]
    last_name: String,
}

#[derive(Args, Debug)]
struct Definitions {
    #[command(subcommand)]
    command: DefinitionsCommand,
}

#[derive(Subcommand, Debug)]
enum DefinitionsCommand {
    /// Adds the default catalog. Entries already present are skipped.
    Seed,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn notice(message: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(message),
        Print("\r\n")
    )?;
    Ok(())
}

/// Asks twice and retries up to three times.
fn prompt_new_password() -> Result<String, Box<dyn Error + Send + Sync>> {
    for _ in 0..3 {
        let first = prompt_password("Password: ")?;
        if first.chars().count() < 8 {
            notice("Password must be at least 8 characters.")?;
            continue;
        }

        let second = prompt_password("Confirm password: ")?;
        if first == second {
            return Ok(first);
        }
        notice("Passwords do not match. Try again.")?;
    }

    Err("too many attempts".into())
}

async fn connect_db(database_url: &str) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Inserts every catalog entry whose abbreviation is not taken yet. Returns
/// how many were added.
async fn seed_definitions(engine: &Engine) -> Result<usize, EngineError> {
    let caller = Caller::new("ledger_admin");
    let mut added = 0;
    for (name, abbreviation, suffix) in catalog::DEFAULT_DEFINITIONS {
        let cmd = DefinitionNew {
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            suffix: suffix.to_string(),
        };
        match engine.new_definition(&caller, cmd).await {
            Ok(_) => added += 1,
            Err(EngineError::ExistingKey(_)) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(added)
}

fn created_message(user: &engine::User) -> String {
    format!(
        "created user: {} <{}> ({})",
        user.full_name(),
        user.email,
        user.id
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_new_password()?;
            let cmd = UserNew {
                email: args.email,
                password,
                first_name: args.first_name,
                last_name: args.last_name,
            };
            match engine.register(&CancelSignal::never(), cmd).await {
                Ok(user) => println!("{}", created_message(&user)),
                Err(EngineError::ExistingKey(email)) => {
                    eprintln!("user already exists: {email}");
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Definitions(Definitions {
            command: DefinitionsCommand::Seed,
        }) => {
            let added = seed_definitions(&engine).await?;
            println!(
                "seeded {added} definitions ({} already present)",
                catalog::DEFAULT_DEFINITIONS.len() - added
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeding_twice_adds_nothing_new() {
        let db = connect_db("sqlite::memory:").await.unwrap();
        let engine = Engine::builder().database(db).build().await.unwrap();

        let first = seed_definitions(&engine).await.unwrap();
        assert_eq!(first, catalog::DEFAULT_DEFINITIONS.len());
        let second = seed_definitions(&engine).await.unwrap();
        assert_eq!(second, 0);

        let caller = Caller::new("ledger_admin");
        let btc = engine
            .definition_by_abbreviation(&caller, "btc")
            .await
            .unwrap();
        assert_eq!(btc.name, "Bitcoin");
    }

    #[tokio::test]
    async fn created_message_names_the_user() {
        let db = connect_db("sqlite::memory:").await.unwrap();
        let engine = Engine::builder().database(db).build().await.unwrap();
        let user = engine
            .register(
                &CancelSignal::never(),
                UserNew {
                    email: "Carol@Example.com".to_string(),
                    password: "password123".to_string(),
                    first_name: "Carol".to_string(),
                    last_name: String::new(),
                },
            )
            .await
            .unwrap();

        let message = created_message(&user);
        assert!(message.starts_with("created user: Carol <carol@example.com> ("));
        assert!(message.contains(&user.id.to_string()));
    }
}
