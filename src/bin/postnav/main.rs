use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use spdlog::{info, warn};
use tokio::task::LocalSet;

use postnav::config::Config;
use postnav::document::Region;
use postnav::fetch::HttpFetcher;
use postnav::headless::HeadlessPage;
use postnav::logger::configure_logger;
use postnav::navigator::{LoadOutcome, PostNavigator};

use crate::config::open_config;

mod config;

const CFG_FILE_NAME: &str = "postnav.toml";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config path
    #[arg(short, long)]
    config_path: Option<String>,

    /// Saved list page to scrape when the site has no manifest
    #[arg(short, long)]
    page: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Opens a post by url
    Open { url: String },
    /// Opens a post by slug
    Slug { slug: String },
    /// Lists indexed posts
    List,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config_path.map(PathBuf::from);

    let config = match open_config(config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            eprintln!("Please run postnav --help");
            return Ok(());
        }
    };

    if let Err(err) = configure_logger(&config) {
        warn!("Error creating logger sinks. Using console instead. Desc={}", err);
    }

    let page = match args.page {
        Some(ref path) => {
            let html = fs::read_to_string(path)
                .with_context(|| format!("Error reading page {}", path.display()))?;
            HeadlessPage::new(&html)
        }
        None => HeadlessPage::empty(),
    };

    LocalSet::new().run_until(run(config, Rc::new(page), args.command)).await
}

async fn run(config: Config, page: Rc<HeadlessPage>, command: Command) -> Result<()> {
    let fetcher = HttpFetcher::new(&config.site.base_url);
    let navigator = PostNavigator::new(page.clone(), fetcher, config.navigator_options())?;

    let source = navigator.bootstrap().await;
    info!("Index built from {:?} with {} posts", source, navigator.index().len());

    let outcome = match command {
        Command::List => {
            for post in navigator.index().posts() {
                println!("{}", post);
            }
            return Ok(());
        }
        Command::Open { url } => navigator.load(&url, true).await,
        Command::Slug { slug } => navigator.load_post_by_slug(&slug).await,
    };

    match outcome {
        LoadOutcome::Displayed => {
            println!("{}", page.title());
            if page.is_visible(Region::PostContent) {
                println!("{}", page.post_content());
            }
            Ok(())
        }
        LoadOutcome::Ignored => bail!("Another load was in progress"),
        LoadOutcome::Failed(_) => {
            for (_, message) in page.notifications() {
                eprintln!("{}", message);
            }
            bail!("Failed to load post")
        }
    }
}
