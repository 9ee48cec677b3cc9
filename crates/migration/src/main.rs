use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;

#[derive(Parser, Debug)]
#[command(name = "migration", about = "Ledger schema migrations")]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./ledger.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Option<Step>,
}

#[derive(Subcommand, Debug)]
enum Step {
    /// Apply pending migrations (all of them unless `--steps` is given).
    Up {
        #[arg(long)]
        steps: Option<u32>,
    },
    /// Roll back applied migrations (the last one unless `--steps` is given).
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Drop every table and apply all migrations.
    Fresh,
    /// Roll back all migrations and apply them again.
    Refresh,
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let db = Database::connect(&cli.database_url).await?;

    match cli.command.unwrap_or(Step::Up { steps: None }) {
        Step::Up { steps } => Migrator::up(&db, steps).await?,
        Step::Down { steps } => Migrator::down(&db, Some(steps)).await?,
        Step::Fresh => Migrator::fresh(&db).await?,
        Step::Refresh => Migrator::refresh(&db).await?,
        Step::Status => Migrator::status(&db).await?,
    }

    Ok(())
}
