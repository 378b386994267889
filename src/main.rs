use std::path::PathBuf;

use anyhow::Context;
use axum::extract::FromRef;
use clap::{Parser, Subcommand};

mod auth;
mod commands;
mod config;
mod controllers;
mod db;
mod error;
mod types;
mod users;

use config::Config;
use db::Database;
pub(crate) use error::{ApiError, ApiResult};
use users::Users;

#[derive(Debug, Parser)]
#[command(version, about = "A small authenticated pastebin API")]
struct Cli {
    /// Config file to use instead of the default location.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API server.
    Serve,
    /// Create the database tables and seed the id counter.
    InitDb,
}

#[derive(Clone, FromRef)]
pub struct App {
    config: Config,
    database: Database,
    users: Users,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path).await?;

    let database = Database::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    let users = match cli.command {
        Command::Serve => Users::load(&config.users_file).await?,
        Command::InitDb => Users::default(),
    };

    let app = App {
        config,
        database,
        users,
    };

    match cli.command {
        Command::Serve => commands::serve::run(app).await,
        Command::InitDb => commands::init_db::run(app).await,
    }
}
