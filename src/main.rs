use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedrelay::app::AppContext;
use feedrelay::cli::{commands, Cli, Commands};
use feedrelay::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    if let Commands::Crawl { enrich: true, .. } = cli.command {
        // enrich synchronously at the end of the crawl instead
        config.extractor.background = false;
    }

    let ctx = AppContext::with_workers(config, cli.workers)?;

    match cli.command {
        Commands::Sources => {
            commands::list_sources(&ctx)?;
        }
        Commands::Fetch { source, page, json } => {
            commands::fetch_page(&ctx, &source, page, json).await?;
        }
        Commands::Crawl {
            source,
            pages,
            enrich,
            json,
        } => {
            commands::crawl(&ctx, &source, pages, enrich, json).await?;
        }
        Commands::Refresh => {
            commands::refresh_all(&ctx).await?;
        }
        Commands::Open {
            source,
            guid,
            rewrite,
            summarize,
        } => {
            commands::open_article(&ctx, &source, &guid, rewrite, summarize).await?;
        }
        Commands::Extract { url } => {
            commands::extract(&ctx, &url).await?;
        }
        Commands::Embed { url } => {
            commands::embed(&ctx, &url).await?;
        }
    }

    ctx.reader.shutdown().await;
    Ok(())
}
