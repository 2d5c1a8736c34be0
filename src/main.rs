use modelrouter::cli::commands::{CliArgs, Commands};
use modelrouter::cli::handlers::{
    handle_benchmark, handle_catalog, handle_config, handle_discover, handle_favorite,
    handle_generate, handle_hardware, handle_pull, handle_recommend,
};
use modelrouter::cli::OutputFormat;
use modelrouter::util::logging::parse_level;
use modelrouter::{init_logging, LoggingConfig, VERSION};

use clap::Parser;
use std::env;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("modelrouter v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let format = OutputFormat::from(args.format);
    let exit_code = match &args.command {
        Commands::Hardware => handle_hardware(format).await,
        Commands::Discover => handle_discover(format).await,
        Commands::Catalog(catalog_args) => handle_catalog(catalog_args, format).await,
        Commands::Recommend(recommend_args) => handle_recommend(recommend_args, format).await,
        Commands::Benchmark(benchmark_args) => {
            handle_benchmark(benchmark_args, format, args.quiet).await
        }
        Commands::Generate(generate_args) => handle_generate(generate_args, format).await,
        Commands::Pull(pull_args) => handle_pull(pull_args).await,
        Commands::Favorite(favorite_args) => handle_favorite(favorite_args).await,
        Commands::Config => handle_config(format),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var("MODELROUTER_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
        parse_level(&level_str)
    };

    let mut config = LoggingConfig::with_level(level);
    config.use_json = env::var("MODELROUTER_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);
    init_logging(config);
}
