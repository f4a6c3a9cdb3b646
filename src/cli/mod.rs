pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::fetcher::parallel::DEFAULT_WORKERS;

#[derive(Parser)]
#[command(name = "feedrelay")]
#[command(about = "Fetch, paginate and extract articles through HTTP relays", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/feedrelay/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of sources refreshed in parallel
    #[arg(short, long, default_value_t = DEFAULT_WORKERS, global = true)]
    pub workers: usize,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List configured sources
    Sources,
    /// Fetch one page of a source
    Fetch {
        /// Source id
        source: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        /// Print articles as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load pages 1..N of a source, stopping when it runs out
    Crawl {
        /// Source id
        source: String,
        #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
        /// Replace stub content with extracted full text
        #[arg(long)]
        enrich: bool,
        /// Print the accumulated state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reload page 1 of every source
    Refresh,
    /// Open one article, extracting its full text if needed
    Open {
        /// Source id
        source: String,
        /// Article guid (or link)
        guid: String,
        /// Pipe the content through the rewrite transform
        #[arg(long, conflicts_with = "summarize")]
        rewrite: bool,
        /// Pipe the content through the summarize transform
        #[arg(long)]
        summarize: bool,
    },
    /// Extract the article body of a web page
    Extract { url: String },
    /// Fetch a web page for embedding, with an injected <base> tag
    Embed { url: String },
}
