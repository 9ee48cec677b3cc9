use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{AccountKind, BalanceDrift, Currency, Engine, EngineError, Money, NewAccountCmd};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "ledger_admin")]
#[command(about = "Admin utilities for the ledger (migrations, balance checks and repair)")]
struct Cli {
    /// Database connection string; overrides the configured database (also
    /// read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending schema migrations.
    Migrate,
    /// Report accounts whose balance differs from their transactions.
    Check(OwnerArgs),
    /// Rewrite drifted balances from the transactions.
    Repair(OwnerArgs),
    /// List the accounts of an owner with their balances.
    Accounts(AccountsArgs),
    /// Open an account, posting the opening balance as a transaction.
    Open(OpenArgs),
}

#[derive(Args, Debug)]
struct OwnerArgs {
    /// Restrict to one owner; every owner otherwise.
    #[arg(long)]
    owner: Option<String>,
}

#[derive(Args, Debug)]
struct AccountsArgs {
    #[arg(long)]
    owner: String,
    /// Include deactivated accounts.
    #[arg(long)]
    all: bool,
}

#[derive(Args, Debug)]
struct OpenArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    name: String,
    /// checking, savings, credit, investment or cash.
    #[arg(long, default_value = "checking")]
    kind: String,
    #[arg(long, default_value = "EUR")]
    currency: String,
    /// Opening balance in major units, e.g. `125.50` or `-20`.
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    opening: String,
}

fn open_account_cmd(args: &OpenArgs) -> Result<NewAccountCmd, EngineError> {
    let kind = AccountKind::try_from(args.kind.trim().to_lowercase().as_str())?;
    let currency = Currency::try_from(args.currency.as_str())?;
    let opening = Money::parse(&args.opening, currency)?;
    Ok(NewAccountCmd::new(args.owner.as_str(), args.name.as_str(), kind)
        .currency(currency)
        .opening_balance(opening.minor()))
}

async fn connect_db(database_url: &str) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = sea_orm::Database::connect(database_url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

async fn owners(
    engine: &Engine,
    owner: Option<String>,
) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
    match owner {
        Some(owner) => Ok(vec![owner]),
        None => Ok(engine.owners().await?),
    }
}

fn print_drifts(owner: &str, drifts: &[BalanceDrift]) {
    for drift in drifts {
        println!(
            "{owner}\t{}\tstored {}\texpected {}\toff by {}",
            drift.account_id,
            drift.stored_minor,
            drift.expected_minor,
            drift.difference()
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "ledger_admin={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    let url = cli
        .database_url
        .unwrap_or_else(|| settings.database.url());
    let db = connect_db(&url).await?;
    let engine = Engine::builder().database(db).build().await?;

    if settings.ledger.repair_on_start {
        for owner in engine.owners().await? {
            let repaired = engine.repair_ledger(&owner).await?;
            if !repaired.is_empty() {
                tracing::info!(%owner, accounts = repaired.len(), "repaired on start");
            }
        }
    } else if settings.ledger.verify_on_start {
        for owner in engine.owners().await? {
            engine.verify_ledger(&owner).await?;
        }
    }

    match cli.command {
        Command::Migrate => {
            println!("schema up to date");
        }
        Command::Check(args) => {
            let mut drifted = 0;
            for owner in owners(&engine, args.owner).await? {
                let drifts = engine.verify_ledger(&owner).await?;
                print_drifts(&owner, &drifts);
                drifted += drifts.len();
            }
            if drifted > 0 {
                eprintln!("{drifted} account(s) out of balance");
                std::process::exit(1);
            }
            println!("ledger consistent");
        }
        Command::Repair(args) => {
            let mut repaired = 0;
            for owner in owners(&engine, args.owner).await? {
                let drifts = engine.repair_ledger(&owner).await?;
                print_drifts(&owner, &drifts);
                repaired += drifts.len();
            }
            println!("repaired {repaired} account(s)");
        }
        Command::Accounts(args) => {
            for account in engine.accounts(&args.owner, args.all).await? {
                let balance = Money::new(account.balance_minor, account.currency);
                let status = if account.active { "" } else { "\t(inactive)" };
                println!(
                    "{}\t{}\t{}\t{balance}{status}",
                    account.id,
                    account.name,
                    account.kind.as_str()
                );
            }
        }
        Command::Open(args) => {
            let cmd = open_account_cmd(&args)?;
            let opening = Money::new(cmd.opening_balance_minor, cmd.currency);
            let account_id = engine.new_account(cmd).await?;
            println!("{account_id}\t{}\t{opening}", args.name.trim());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(kind: &str, currency: &str, opening: &str) -> OpenArgs {
        OpenArgs {
            owner: "alice".to_string(),
            name: "Wallet".to_string(),
            kind: kind.to_string(),
            currency: currency.to_string(),
            opening: opening.to_string(),
        }
    }

    #[test]
    fn open_parses_the_opening_balance_in_major_units() {
        let cmd = open_account_cmd(&args("Cash", "usd", "-12,50")).unwrap();
        assert_eq!(cmd.kind, AccountKind::Cash);
        assert_eq!(cmd.currency, Currency::Usd);
        assert_eq!(cmd.opening_balance_minor, -1250);

        let cmd = open_account_cmd(&args("savings", "JPY", "300")).unwrap();
        assert_eq!(cmd.opening_balance_minor, 300);
    }

    #[test]
    fn open_rejects_bad_input_before_touching_the_store() {
        assert!(matches!(
            open_account_cmd(&args("checking", "EUR", "1.234")),
            Err(EngineError::InvalidArgument { field: "amount", .. })
        ));
        assert!(matches!(
            open_account_cmd(&args("brokerage", "EUR", "0")),
            Err(EngineError::InvalidArgument { field: "account_kind", .. })
        ));
        assert!(matches!(
            open_account_cmd(&args("checking", "XYZ", "0")),
            Err(EngineError::InvalidArgument { field: "currency", .. })
        ));
    }
}
