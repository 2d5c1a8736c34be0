//! Subcommand handlers
//!
//! Each handler builds what it needs from [`RouterConfig`], prints its result
//! to stdout and returns the process exit code.

use super::commands::{
    BenchmarkArgs, CatalogArgs, FavoriteArgs, GenerateArgs, PullArgs, RecommendArgs,
};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::RouterConfig;
use crate::progress::{BarHandler, LoggingHandler, ProgressHandler};
use crate::router::GenerateOptions;
use crate::studio::Studio;
use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

fn load_config() -> Result<RouterConfig> {
    let config = RouterConfig::default();
    config.validate()?;
    debug!("Configuration: {}", config);
    Ok(config)
}

fn emit(result: Result<String>) -> i32 {
    match result {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn studio_or_exit(config: Result<RouterConfig>) -> Result<Studio, i32> {
    match config {
        Ok(config) => Ok(Studio::from_config(config)),
        Err(e) => {
            eprintln!("Error: invalid configuration: {:#}", e);
            Err(1)
        }
    }
}

pub async fn handle_hardware(format: OutputFormat) -> i32 {
    let studio = match studio_or_exit(load_config()) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let profile = studio.detect_hardware().await;
    emit(OutputFormatter::new(format).format_hardware(&profile))
}

pub async fn handle_discover(format: OutputFormat) -> i32 {
    let studio = match studio_or_exit(load_config()) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let snapshot = studio.discover_providers().await;
    info!(
        reachable = snapshot.reachable_count(),
        total = snapshot.providers.len(),
        "Discovery complete"
    );
    emit(OutputFormatter::new(format).format_providers(&snapshot))
}

pub async fn handle_catalog(args: &CatalogArgs, format: OutputFormat) -> i32 {
    let studio = match studio_or_exit(load_config()) {
        Ok(s) => s,
        Err(code) => return code,
    };
    studio.discover_providers().await;
    let items: Vec<_> = studio
        .model_catalog()
        .await
        .into_iter()
        .filter(|item| !args.installed || item.installed)
        .filter(|item| !args.favorites || item.favorite)
        .collect();
    emit(OutputFormatter::new(format).format_catalog(&items))
}

pub async fn handle_recommend(args: &RecommendArgs, format: OutputFormat) -> i32 {
    let studio = match studio_or_exit(load_config()) {
        Ok(s) => s,
        Err(code) => return code,
    };
    studio.start().await;
    let set = studio.set_preferences(args.use_case, args.priority).await;
    emit(OutputFormatter::new(format).format_recommendations(&set, args.limit))
}

pub async fn handle_benchmark(args: &BenchmarkArgs, format: OutputFormat, quiet: bool) -> i32 {
    let config = load_config().map(|mut config| {
        if let Some(batch) = args.batch {
            config.benchmark_batch_size = batch;
        }
        config
    });
    let studio = match studio_or_exit(config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    studio.discover_providers().await;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after the current batch");
            on_interrupt.cancel();
        }
    });

    // The bar only makes sense when a human reads the terminal
    let progress: Box<dyn ProgressHandler> = if quiet || format != OutputFormat::Human {
        Box::new(LoggingHandler)
    } else {
        Box::new(BarHandler::new())
    };

    let run = studio
        .run_benchmarks_with(&args.models, &cancel, progress.as_ref())
        .await;
    let failed = run.results.iter().filter(|r| !r.success).count();

    let code = emit(OutputFormatter::new(format).format_benchmarks(&run));
    if code == 0 && (run.cancelled || failed == run.results.len()) {
        1
    } else {
        code
    }
}

pub async fn handle_generate(args: &GenerateArgs, format: OutputFormat) -> i32 {
    let studio = match studio_or_exit(load_config()) {
        Ok(s) => s,
        Err(code) => return code,
    };
    studio.start().await;

    let mut options = GenerateOptions::default();
    if let Some(model) = &args.model {
        options = options.with_model(model.clone());
    }
    if let Some(temperature) = args.temperature {
        options = options.with_temperature(temperature);
    }
    if let Some(max_tokens) = args.max_tokens {
        options = options.with_max_tokens(max_tokens);
    }

    match studio.generate(&args.prompt, options).await {
        Ok(response) => emit(OutputFormatter::new(format).format_generation(&response)),
        Err(e) => {
            error!("Generation failed: {}", e);
            eprintln!("Error: {}", e);
            1
        }
    }
}

pub async fn handle_pull(args: &PullArgs) -> i32 {
    let studio = match studio_or_exit(load_config()) {
        Ok(s) => s,
        Err(code) => return code,
    };
    studio.discover_providers().await;

    info!(model = %args.model, "Pulling model");
    match studio.pull_model(&args.model).await {
        Ok(()) => {
            println!("✓ {} is installed", args.model);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

pub async fn handle_favorite(args: &FavoriteArgs) -> i32 {
    let studio = match studio_or_exit(load_config()) {
        Ok(s) => s,
        Err(code) => return code,
    };
    match studio.toggle_favorite(&args.model).await {
        Ok(true) => {
            println!("★ {} added to favorites", args.model);
            0
        }
        Ok(false) => {
            println!("☆ {} removed from favorites", args.model);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

pub fn handle_config(format: OutputFormat) -> i32 {
    let config = RouterConfig::default();
    if let Err(e) = config.validate() {
        eprintln!("Warning: {}", e);
    }
    emit(OutputFormatter::new(format).format_config(&config))
}
