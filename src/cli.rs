use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::catalog::DEFAULT_CATALOG_BASE_URL;
use crate::http::DEFAULT_UPSTREAM_TIMEOUT_SECS;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API server.
    Serve(ServeArgs),
    /// Fetch one catalog recipe and print it normalized.
    Lookup(LookupArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CatalogArgs {
    /// Base URL of the recipe catalog API.
    #[arg(long, env = "DISH_CATALOG_BASE_URL", default_value = DEFAULT_CATALOG_BASE_URL)]
    pub catalog_base_url: String,

    /// Per-request timeout for catalog calls.
    #[arg(long, env = "DISH_CATALOG_TIMEOUT_SECS", default_value_t = 10)]
    pub catalog_timeout_secs: u64,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, env = "DISH_ADDR", default_value = "127.0.0.1:8000")]
    pub addr: SocketAddr,

    /// Directory for the local saved-recipe store (used when Firestore is not configured).
    #[arg(long, env = "DISH_DATA_DIR", default_value = "workspace-app")]
    pub data_dir: PathBuf,

    /// Web client directory (`index.html`, `saved_recipes.html`, `static/`).
    #[arg(long, env = "DISH_WEB_DIR", default_value = "web")]
    pub web_dir: PathBuf,

    /// Per-request timeout for identity verification and Firestore calls.
    #[arg(long, env = "DISH_UPSTREAM_TIMEOUT_SECS", default_value_t = DEFAULT_UPSTREAM_TIMEOUT_SECS)]
    pub upstream_timeout_secs: u64,

    #[command(flatten)]
    pub catalog: CatalogArgs,
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Catalog meal id (e.g. 52772).
    #[arg(long)]
    pub id: String,

    #[command(flatten)]
    pub catalog: CatalogArgs,
}
