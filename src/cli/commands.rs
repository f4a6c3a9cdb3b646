use crate::app::{AppContext, FeedRelayError, LoadStatus, Result};
use crate::domain::Article;

pub fn list_sources(ctx: &AppContext) -> Result<()> {
    if ctx.config.sources.is_empty() {
        println!("No sources");
        return Ok(());
    }

    for source in &ctx.config.sources {
        let paging = if ctx.pipeline.strategies().get(&source.id).is_some() {
            "strategy"
        } else {
            "generic"
        };
        println!(
            "{} [{:?}, {} paging]\n  {}\n  {}",
            source.display_name(),
            source.kind,
            paging,
            source.id,
            source.url
        );
    }

    Ok(())
}

pub async fn fetch_page(ctx: &AppContext, source_id: &str, page: u32, json: bool) -> Result<()> {
    let source = ctx.config.find_source(source_id)?;
    let articles = ctx.pipeline.fetch_page(source, page).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&articles)?);
    } else {
        println!("{} page {}: {} articles", source.display_name(), page, articles.len());
        print_articles(&articles);
    }
    Ok(())
}

pub async fn crawl(ctx: &AppContext, source_id: &str, pages: u32, enrich: bool, json: bool) -> Result<()> {
    let reader = &ctx.reader;

    for status in reader.crawl(source_id, pages).await? {
        report(&status);
    }

    if enrich {
        let attempted = reader.enrich_source(source_id).await?;
        println!("Enrichment attempted for {} stub articles", attempted);
    }

    let state = reader
        .snapshot(source_id)?
        .ok_or_else(|| FeedRelayError::SourceNotFound(source_id.to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        println!(
            "{} articles across {} pages (more available: {})",
            state.articles.len(),
            state.page,
            state.has_more
        );
        print_articles(&state.articles);
    }
    Ok(())
}

fn report(status: &LoadStatus) {
    match status {
        LoadStatus::Loaded(outcome) => println!(
            "  page {}: {} fetched, {} new",
            outcome.page, outcome.fetched, outcome.added
        ),
        LoadStatus::Cached => println!("  page 1 served from cache"),
        LoadStatus::Busy => println!("  load already in progress"),
        LoadStatus::Exhausted => println!("  no more pages"),
    }
}

pub async fn refresh_all(ctx: &AppContext) -> Result<()> {
    println!("Refreshing {} sources...", ctx.reader.sources().len());

    let results = ctx.reader.refresh_all().await;

    let mut total_new = 0;
    let mut errors = 0;

    for (source_id, result) in results {
        match result {
            Ok(LoadStatus::Loaded(outcome)) => {
                total_new += outcome.added;
                println!("  {}: {} articles", source_id, outcome.added);
            }
            Ok(other) => println!("  {}: {:?}", source_id, other),
            Err(e) => {
                errors += 1;
                eprintln!("  Error loading {}: {}", source_id, e);
            }
        }
    }

    println!("Refresh complete: {} articles, {} errors", total_new, errors);
    Ok(())
}

pub async fn open_article(
    ctx: &AppContext,
    source_id: &str,
    guid: &str,
    rewrite: bool,
    summarize: bool,
) -> Result<()> {
    let reader = &ctx.reader;
    reader.load(source_id, false).await?;

    if rewrite {
        println!("{}", reader.rewrite_article(source_id, guid).await?);
    } else if summarize {
        println!("{}", reader.summarize_article(source_id, guid).await?);
    } else {
        let article = reader.open_article(source_id, guid).await?;
        println!("{}\n{}\n", article.title, article.link);
        println!("{}", article.content);
    }
    Ok(())
}

pub async fn extract(ctx: &AppContext, url: &str) -> Result<()> {
    match ctx.extractor.extract_full_text(url).await {
        Some(content) => println!("{}", content),
        None => eprintln!("Could not extract an article from {}", url),
    }
    Ok(())
}

pub async fn embed(ctx: &AppContext, url: &str) -> Result<()> {
    let page = ctx
        .extractor
        .fetch_for_embedding(url)
        .await
        .ok_or_else(|| FeedRelayError::Unavailable(url.to_string()))?;
    println!("{}", page);
    Ok(())
}

fn print_articles(articles: &[Article]) {
    for article in articles {
        let author = if article.author.is_empty() {
            String::new()
        } else {
            format!(" ({})", article.author)
        };
        println!(
            "{} {}{}\n  {}\n  {}",
            article.published_at.format("%Y-%m-%d %H:%M"),
            article.title,
            author,
            article.link,
            article.guid
        );
    }
}
