mod cli;
mod infra;
mod routes;
mod server;

use surveyor_registry::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
