use crate::catalog::UseCase;
use crate::recommend::Priority;
use clap::{Parser, Subcommand, ValueEnum};

/// Discover, recommend, benchmark and route across local and cloud LLM providers
#[derive(Parser, Debug)]
#[command(
    name = "modelrouter",
    about = "Discover, recommend, benchmark and route across local and cloud LLM providers",
    version,
    long_about = "modelrouter probes local runtimes (Ollama, LM Studio) and cloud vendors \
                  (Anthropic, OpenAI, Gemini, Groq), recommends models for your hardware, \
                  benchmarks them side by side and routes prompts with automatic fallback."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,

    #[arg(
        short = 'f',
        long,
        global = true,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Show the detected hardware profile")]
    Hardware,

    #[command(
        about = "Probe every provider and list reachable ones",
        long_about = "Probes local runtimes and configured cloud vendors concurrently and \
                      reports reachability, latency and loaded models.\n\n\
                      Examples:\n  \
                      modelrouter discover\n  \
                      modelrouter discover --format json"
    )]
    Discover,

    #[command(about = "List the model catalog with installed and favorite state")]
    Catalog(CatalogArgs),

    #[command(
        about = "Rank catalog models for a use case",
        long_about = "Scores every catalog model against the detected hardware and the \
                      reachable providers.\n\n\
                      Examples:\n  \
                      modelrouter recommend --use-case coding --priority speed\n  \
                      modelrouter recommend --use-case chat --limit 3"
    )]
    Recommend(RecommendArgs),

    #[command(
        about = "Benchmark models with a fixed evaluation prompt",
        long_about = "Runs the same prompt against each model in order and reports latency, \
                      throughput and a quality indicator.\n\n\
                      Examples:\n  \
                      modelrouter benchmark llama3.1:8b phi3:mini\n  \
                      modelrouter benchmark --batch 2 gpt-4o-mini claude-haiku-4-5"
    )]
    Benchmark(BenchmarkArgs),

    #[command(
        about = "Send a prompt through the fallback router",
        long_about = "Generates a response with the active or requested model, falling back \
                      to other reachable providers on failure.\n\n\
                      Examples:\n  \
                      modelrouter generate \"Explain ownership in Rust\"\n  \
                      modelrouter generate --model gpt-4o \"Hello\""
    )]
    Generate(GenerateArgs),

    #[command(about = "Pull a model into its local runtime")]
    Pull(PullArgs),

    #[command(about = "Toggle a catalog model as favorite")]
    Favorite(FavoriteArgs),

    #[command(about = "Show the effective configuration")]
    Config,
}

#[derive(Parser, Debug, Clone)]
pub struct CatalogArgs {
    #[arg(long, help = "Only show installed models")]
    pub installed: bool,

    #[arg(long, help = "Only show favorite models")]
    pub favorites: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RecommendArgs {
    #[arg(
        short = 'u',
        long,
        value_parser = parse_use_case,
        default_value = "general",
        help = "Use case: coding, chat, reasoning, writing, general"
    )]
    pub use_case: UseCase,

    #[arg(
        short = 'p',
        long,
        value_parser = parse_priority,
        default_value = "balanced",
        help = "Priority: speed, balanced, quality"
    )]
    pub priority: Priority,

    #[arg(short = 'n', long, default_value = "10", help = "Maximum rows to show")]
    pub limit: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct BenchmarkArgs {
    #[arg(value_name = "MODEL", required = true, help = "Model ids to benchmark, in order")]
    pub models: Vec<String>,

    #[arg(long, value_name = "N", help = "Models run concurrently (1-4)")]
    pub batch: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(value_name = "PROMPT", help = "Prompt text")]
    pub prompt: String,

    #[arg(short = 'm', long, value_name = "MODEL", help = "Model to use first")]
    pub model: Option<String>,

    #[arg(long, help = "Sampling temperature")]
    pub temperature: Option<f32>,

    #[arg(long, value_name = "TOKENS", help = "Maximum tokens to generate")]
    pub max_tokens: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
pub struct PullArgs {
    #[arg(value_name = "MODEL", help = "Catalog model id")]
    pub model: String,
}

#[derive(Parser, Debug, Clone)]
pub struct FavoriteArgs {
    #[arg(value_name = "MODEL", help = "Catalog model id")]
    pub model: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_use_case(s: &str) -> Result<UseCase, String> {
    s.parse::<UseCase>().map_err(|e| e.to_string())
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    s.parse::<Priority>().map_err(|e| e.to_string())
}
