use crate::server;
use clap::{Args, Parser, Subcommand};
use surveyor_registry::auth::{hash_password, DEFAULT_COST};
use surveyor_registry::config::AppConfig;
use surveyor_registry::error::AppError;
use surveyor_registry::forms::PgFormRepository;
use surveyor_registry::telemetry;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "Surveyor Registry",
    about = "Run and administer the surveyor registration backend",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print a bcrypt hash suitable for ADMIN_PASSWORD_HASH
    HashPassword(HashPasswordArgs),
    /// Apply database migrations and exit
    Migrate,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
struct HashPasswordArgs {
    /// Plain-text password to hash
    password: String,
    /// bcrypt work factor
    #[arg(long, default_value_t = DEFAULT_COST)]
    cost: u32,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::HashPassword(args) => {
            println!("{}", hash_password(&args.password, args.cost)?);
            Ok(())
        }
        Command::Migrate => migrate().await,
    }
}

async fn migrate() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let repository =
        PgFormRepository::connect(config.database.require_url()?, config.database.max_connections)
            .await?;
    repository.migrate().await?;
    info!("migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["surveyor-registry"]).expect("parses");
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["surveyor-registry", "serve", "--port", "8080"])
            .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => assert_eq!(args.port, Some(8080)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn hash_password_defaults_to_cost_ten() {
        let cli = Cli::try_parse_from(["surveyor-registry", "hash-password", "hunter2"])
            .expect("parses");
        match cli.command {
            Some(Command::HashPassword(args)) => {
                assert_eq!(args.password, "hunter2");
                assert_eq!(args.cost, 10);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
