use anyhow::Context;
use clap::Parser;
use sethu_core::config::{DEFAULT_BIND_ADDR, DEFAULT_CHAT_BACKEND_URL};
use sethu_core::journey::parse_journey_date;
use sethu_core::logging::init_logging;
use sethu_core::recommend::DEFAULT_RECOMMENDATION_LIMIT;
use sethu_core::{ArticleView, Config, Journey, JourneyRepository, JourneyStage, Language, QueryParams};
use sethu_scrapers::{handle_command, ScraperArgs, ScraperManager};
use sethu_storage::{build_content_source, create_storage, FileJourneyRepository};
use sethu_web::{AppState, KnowledgeHub};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "JanmaSethu content service", long_about = None)]
pub struct Cli {
    /// Storage backend for leads, stories and scraped content: memory or sqlite
    #[arg(long, env = "SETHU_STORAGE", default_value = "memory")]
    storage: String,
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    /// Directory with metadata.json and the articles/ bundle
    #[arg(long, env = "SETHU_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,
    /// Remote knowledge API; the static bundle is used when unset or down
    #[arg(long, env = "SETHU_REMOTE_API")]
    remote_api: Option<String>,
    #[arg(long, env = "SAKHI_BACKEND_URL", default_value = DEFAULT_CHAT_BACKEND_URL)]
    chat_backend: String,
    #[arg(long, env = "SETHU_LOG", default_value = "info")]
    log_level: tracing::Level,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        #[arg(long, env = "SETHU_BIND", default_value = DEFAULT_BIND_ADDR)]
        bind: String,
    },
    /// Scrape partner clinic sites
    Scrape(ScraperArgs),
    /// Print one page of knowledge hub results
    Search {
        #[arg(long, default_value = "")]
        search: String,
        /// medical, social, financial, nutrition or all
        #[arg(long)]
        lens: Option<String>,
        /// ttc, pregnancy, postpartum, newborn, early-years or all
        #[arg(long)]
        stage: Option<String>,
        #[arg(long, default_value = "en")]
        lang: String,
        #[arg(long, default_value = "1")]
        page: String,
    },
    /// Recommend articles for a journey (the stored one unless given)
    Recommend {
        /// TTC, PREGNANT or PARENT
        #[arg(long)]
        journey: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "en")]
        lang: String,
        #[arg(long, default_value_t = DEFAULT_RECOMMENDATION_LIMIT)]
        limit: usize,
    },
    /// Manage the stored journey
    Journey {
        #[command(subcommand)]
        command: JourneyCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
enum JourneyCommands {
    /// Store a journey stage (TTC, PREGNANT or PARENT)
    Set {
        stage: String,
        /// Cycle start, LMP or date of birth (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },
    Show,
    Clear,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            data_dir: self.data_dir.clone(),
            remote_api_base: self.remote_api.clone().filter(|url| !url.trim().is_empty()),
            chat_backend_url: self.chat_backend.clone(),
            storage: self.storage.clone(),
            database_url: self.database_url.clone(),
            log_level: self.log_level,
            ..Config::default()
        }
    }
}

fn parse_journey(stage: &str, date: Option<&str>) -> anyhow::Result<Journey> {
    let stage: JourneyStage = stage.parse()?;
    let date = match date {
        Some(raw) => Some(parse_journey_date(raw).with_context(|| format!("invalid date: {}", raw))?),
        None => None,
    };
    Ok(Journey::new(stage, date))
}

fn print_views(views: &[ArticleView]) {
    for view in views {
        let lenses: Vec<&str> = view.lens.iter().map(|lens| lens.as_str()).collect();
        println!("  • {} ({} min) [{}]", view.title, view.read_time_minutes, lenses.join(", "));
        println!("    /knowledge/{}", view.slug);
    }
}

async fn search(config: &Config, params: QueryParams, journey: Option<Journey>) -> anyhow::Result<()> {
    let hub = KnowledgeHub::new(build_content_source(config).await?);
    let query = sethu_core::Query::from(params);
    let language = query.language;

    // Recommendations run next to the listing and never hold it up.
    let (listing, picks) = tokio::join!(hub.list(&query, config.page_size), async {
        hub.recommendations(journey.as_ref(), language, DEFAULT_RECOMMENDATION_LIMIT)
            .await
    });

    if !picks.is_empty() {
        println!("✨ Recommended for you:");
        let views: Vec<ArticleView> = picks.iter().map(|article| article.view(language)).collect();
        print_views(&views);
        println!();
    }

    let listing = listing.context("search failed, please try again")?;
    let pagination = &listing.page.pagination;
    println!(
        "📚 {} articles from {} (page {}/{})",
        pagination.total, listing.source, pagination.page, pagination.total_pages
    );
    let views: Vec<ArticleView> = listing.page.items.iter().map(|article| article.view(language)).collect();
    print_views(&views);
    if pagination.has_more {
        println!("  … more on page {}", pagination.page + 1);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);
    let config = cli.config();
    let journeys = FileJourneyRepository::new(config.journey_path());

    match cli.command {
        Commands::Serve { bind } => {
            let state = AppState::from_config(&config).await?;
            sethu_web::serve(state, &bind).await?;
        }
        Commands::Scrape(args) => {
            let storage = create_storage(&config.storage, config.database_url.as_deref()).await?;
            info!("💾 Storage initialized (using {})", config.storage);
            let manager = ScraperManager::new(storage)?;
            handle_command(args, &manager).await?;
        }
        Commands::Search {
            search: term,
            lens,
            stage,
            lang,
            page,
        } => {
            let params = QueryParams {
                search: Some(term),
                lens,
                stage,
                lang: Some(lang),
                page: Some(page),
            };
            let journey = journeys.load().await?;
            search(&config, params, journey).await?;
        }
        Commands::Recommend {
            journey,
            date,
            lang,
            limit,
        } => {
            let journey = match journey {
                Some(stage) => Some(parse_journey(&stage, date.as_deref())?),
                None => journeys.load().await?,
            };
            let Some(journey) = journey else {
                println!("No journey set. Try `sethu journey set PREGNANT --date 2026-06-01`.");
                return Ok(());
            };
            let language = Language::parse_or_default(&lang);
            let hub = KnowledgeHub::new(build_content_source(&config).await?);
            let picks = hub.recommendations(Some(&journey), language, limit).await;
            let target = journey.target_stage(chrono::Utc::now().date_naive());
            println!("✨ {} picks for {} ({})", picks.len(), journey.stage.label(), target.label());
            let views: Vec<ArticleView> = picks.iter().map(|article| article.view(language)).collect();
            print_views(&views);
        }
        Commands::Journey { command } => match command {
            JourneyCommands::Set { stage, date } => {
                let journey = parse_journey(&stage, date.as_deref())?;
                journeys.save(&journey).await?;
                println!("💾 Journey saved: {}", serde_json::to_string(&journey)?);
            }
            JourneyCommands::Show => match journeys.load().await? {
                Some(journey) => println!("{}", serde_json::to_string_pretty(&journey)?),
                None => println!("No journey set."),
            },
            JourneyCommands::Clear => {
                journeys.clear().await?;
                println!("🧹 Journey cleared");
            }
        },
    }

    Ok(())
}
