use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{debug, warn};

mod config;
mod event_bus;
mod formatter;
mod history;
mod llm_manager;
mod logger;
mod meal_planner;
mod providers;
mod render;
mod repl;
mod session;
mod ui;

use config::Config;
use event_bus::{EventBus, EventEmitter};
use llm_manager::{LLMManager, LLMProvider, LocalProvider};
use meal_planner::MealPlanner;
use providers::GeminiProvider;
use render::{OutputFormat, Renderer};
use repl::Shell;

#[derive(Parser)]
#[command(name = "nutrichef", version, about = "Meal plans from your terminal")]
struct Args {
    /// Run without banner, colors or spinner
    #[arg(short = 'H', long)]
    headless: bool,
    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<String>,
    /// Answer with a built-in sample plan instead of calling Gemini
    #[arg(long)]
    offline: bool,
    /// Output format for replies
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
    /// A single meal request; starts the interactive shell when omitted
    #[arg(last = true)]
    request: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logger::init(args.verbose);

    let mut config = Config::load(&args.config)?;
    config.merge_with_args(args.headless, args.format);

    let event_bus = Arc::new(EventBus::new(100));
    let provider: Box<dyn LLMProvider> = match config.gemini() {
        Some(gemini) if !args.offline => Box::new(
            GeminiProvider::new(gemini).context("Set GEMINI_API_KEY or run with --offline")?,
        ),
        Some(_) => Box::new(LocalProvider),
        None => {
            warn!("Gemini is disabled in the config; using the offline sample plan");
            Box::new(LocalProvider)
        }
    };
    let llm_manager = Arc::new(LLMManager::new(vec![provider], event_bus.clone()));

    let mut planner = MealPlanner::new(llm_manager.clone());
    planner.set_event_bus(event_bus.clone());
    let planner = Arc::new(planner);

    let renderer = Renderer::new(config.ui.output_format, config.ui.colorful);
    let ui = ui::UIHandler::new(args.headless, &config.ui);

    let request = args.request.join(" ");
    if !request.trim().is_empty() {
        let outcome = planner.request_plan(&request).await?;
        debug!("'{}' answered with {} bytes", outcome.request, outcome.response.len());
        println!("{}", renderer.render(&outcome.formatted)?);
        if !outcome.succeeded {
            std::process::exit(1);
        }
        return Ok(());
    }

    if renderer.format() != OutputFormat::Json {
        ui.start(llm_manager.provider_name())?;
    }
    let mut shell = Shell::new(
        planner,
        renderer,
        ui,
        event_bus,
        config.ui.history_summary_width,
    );
    shell.run().await
}
