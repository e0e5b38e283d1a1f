use clap::{Args, Subcommand};
use sethu_core::Result;

use crate::manager::{ScraperManager, DEFAULT_MAX_PAGES};

#[derive(Args, Debug, Clone)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScraperCommands {
    /// List available scrapers
    List,
    /// Crawl a source and store what it finds (e.g. medcy-blog, medcy-doctors)
    Source {
        name: String,
        /// Maximum number of pages to scrape
        #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
        max: usize,
    },
    /// Scrape a single page
    Url { url: String },
}

pub async fn handle_command(args: ScraperArgs, manager: &ScraperManager) -> Result<()> {
    match args.command {
        ScraperCommands::List => {
            println!("Available scrapers:");
            for scraper in manager.scrapers() {
                let meta = scraper.source_metadata();
                println!("  {} {} ({}): {}", meta.emoji, meta.name, meta.site, scraper.cli_names().join(", "));
            }
        }
        ScraperCommands::Source { name, max } => {
            let report = manager.scrape_source(&name, max).await?;
            for result in &report.results {
                match (&result.status, &result.error) {
                    (Some(status), _) => println!("{} {}", status.emoji(), result.url),
                    (None, Some(error)) => eprintln!("❌ {}: {}", result.url, error),
                    (None, None) => println!("? {}", result.url),
                }
            }
            println!("{}/{} pages stored", report.succeeded(), report.count);
        }
        ScraperCommands::Url { url } => {
            let (scraped, status) = manager.scrape_url(&url).await?;
            println!("{} {} - {}", status.emoji(), scraped.title(), url);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ScraperArgs,
    }

    #[test]
    fn test_parse_commands() {
        let cli = TestCli::parse_from(["sethu", "source", "medcy-doctors", "--max", "3"]);
        match cli.args.command {
            ScraperCommands::Source { name, max } => {
                assert_eq!(name, "medcy-doctors");
                assert_eq!(max, 3);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = TestCli::parse_from(["sethu", "source", "medcy-blog"]);
        assert!(matches!(cli.args.command, ScraperCommands::Source { max: 8, .. }));
        assert!(matches!(TestCli::parse_from(["sethu", "list"]).args.command, ScraperCommands::List));
    }
}
