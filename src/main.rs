use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let dotenv = dotenvy::dotenv();

    dish_recommender::logging::init().context("init logging")?;
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let cli = dish_recommender::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        dish_recommender::cli::Command::Serve(args) => {
            dish_recommender::app::server::serve(args)
                .await
                .context("serve")?;
        }
        dish_recommender::cli::Command::Lookup(args) => {
            dish_recommender::catalog::run_lookup(args)
                .await
                .context("lookup")?;
        }
    }

    Ok(())
}
