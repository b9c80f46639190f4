//! Kitty operator entry point.
//!
//! Runs on the host next to the database. Every command opens the ledger,
//! which upgrades its schema, and then does one thing.

use anyhow::Context;
use clap::{Parser, Subcommand};
use kitty_auth::{ActorVerifier, AuthConfig};
use kitty_db::repository::{
    SurrealConsumptionRepository, SurrealMemberRepository, SurrealMoneyMoveRepository,
};
use kitty_db::{DbConfig, LedgerDb};
use kitty_fund::{BalanceCalculator, FundConfig, MemberService, RosterLock};
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::Client;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kitty", about = "Shared kitty fund ledger", version)]
struct Cli {
    /// SurrealDB WebSocket address.
    #[arg(long, env = "KITTY_DB_URL", default_value = "127.0.0.1:8000")]
    db_url: String,
    #[arg(long, env = "KITTY_DB_NAMESPACE", default_value = "kitty")]
    db_namespace: String,
    #[arg(long, env = "KITTY_DB_DATABASE", default_value = "main")]
    db_database: String,
    #[arg(long, env = "KITTY_DB_USERNAME", default_value = "root")]
    db_username: String,
    #[arg(long, env = "KITTY_DB_PASSWORD", default_value = "root", hide_env_values = true)]
    db_password: String,

    /// Pepper mixed into every PIN hash.
    #[arg(long, env = "KITTY_PIN_PEPPER", hide_env_values = true)]
    pin_pepper: Option<String>,
    #[arg(long, env = "KITTY_MIN_PIN_LENGTH", default_value_t = 4)]
    min_pin_length: usize,

    /// Balances below this many minor units count as low.
    #[arg(long, env = "KITTY_BALANCE_THRESHOLD", default_value_t = 1000)]
    balance_threshold: i64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upgrade the schema and print its version.
    Migrate,
    /// Create the first administrator of an empty roster.
    BootstrapAdmin {
        #[arg(long)]
        name: String,
        #[arg(long, env = "KITTY_ADMIN_PIN", hide_env_values = true)]
        pin: String,
    },
    /// Set a member's PIN without their current one.
    ResetPin {
        /// Display name of the member.
        #[arg(long)]
        member: String,
        #[arg(long, env = "KITTY_NEW_PIN", hide_env_values = true)]
        pin: String,
    },
    /// Print the balances of all active members as JSON.
    Balances {
        /// Only members strictly below the threshold.
        #[arg(long)]
        low: bool,
    },
}

impl Cli {
    fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.db_url.clone(),
            namespace: self.db_namespace.clone(),
            database: self.db_database.clone(),
            username: self.db_username.clone(),
            password: self.db_password.clone(),
        }
    }

    fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            pepper: self.pin_pepper.clone(),
            min_pin_length: self.min_pin_length,
            ..AuthConfig::default()
        }
    }

    fn fund_config(&self) -> FundConfig {
        FundConfig {
            balance_threshold: self.balance_threshold,
            ..FundConfig::default()
        }
    }

    fn member_repository(&self, db: &Surreal<Client>) -> SurrealMemberRepository<Client> {
        match &self.pin_pepper {
            Some(pepper) => SurrealMemberRepository::with_pepper(db.clone(), pepper.clone()),
            None => SurrealMemberRepository::new(db.clone()),
        }
    }

    fn member_service(&self, db: &Surreal<Client>) -> MemberService<SurrealMemberRepository<Client>> {
        let members = self.member_repository(db);
        let verifier = ActorVerifier::new(members.clone(), self.auth_config());
        MemberService::new(verifier, members, RosterLock::new())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("kitty=info".parse()?))
        .json()
        .init();

    let cli = Cli::parse();

    let ledger = LedgerDb::open(&cli.db_config())
        .await
        .context("opening the ledger database")?;
    let db = ledger.client();

    match &cli.command {
        Command::Migrate => {
            println!("schema v{}", ledger.schema_version());
        }
        Command::BootstrapAdmin { name, pin } => {
            let admin = cli
                .member_service(db)
                .bootstrap_administrator(name, pin)
                .await
                .context("bootstrapping administrator")?;
            println!("{}", admin.id);
        }
        Command::ResetPin { member, pin } => {
            let service = cli.member_service(db);
            let target = service
                .get_by_display_name(member)
                .await
                .with_context(|| format!("looking up member {member:?}"))?;
            service
                .recover_pin(target.id, pin)
                .await
                .context("resetting PIN")?;
        }
        Command::Balances { low } => {
            let calculator = BalanceCalculator::new(
                cli.member_repository(db),
                SurrealMoneyMoveRepository::new(db.clone()),
                SurrealConsumptionRepository::new(db.clone()),
                cli.fund_config(),
            );
            let balances = if *low {
                calculator.below_threshold(None).await?
            } else {
                calculator.all_balances().await?
            };
            println!("{}", serde_json::to_string_pretty(&balances)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn pepper_reaches_both_configs() {
        let cli = Cli::parse_from([
            "kitty",
            "--pin-pepper",
            "spice",
            "--balance-threshold",
            "250",
            "balances",
            "--low",
        ]);
        assert_eq!(cli.auth_config().pepper.as_deref(), Some("spice"));
        assert_eq!(cli.fund_config().balance_threshold, 250);
        assert!(matches!(cli.command, Command::Balances { low: true }));
    }
}
