//! modelrouter - multi-provider LLM discovery, recommendation and routing
//!
//! Probes local runtimes (Ollama, LM Studio) and cloud vendors (Anthropic,
//! OpenAI, Gemini, Groq), ranks catalog models for a use case against the
//! detected hardware, benchmarks models side by side and routes generation
//! calls with automatic fallback across reachable providers.
//!
//! # Core Concepts
//!
//! - **Providers**: one [`ProviderAdapter`] per vendor, probed concurrently by
//!   the [`ProviderRegistry`] into an immutable [`ProviderSnapshot`]
//! - **Catalog**: curated seed models plus models discovered live, with
//!   favorites persisted across sessions
//! - **Recommendations**: deterministic scoring of the catalog for a
//!   [`UseCase`] and [`Priority`]
//! - **Routing**: the [`FallbackRouter`] walks reachable providers in a fixed
//!   precedence order until one answers
//!
//! # Example Usage
//!
//! ```no_run
//! use modelrouter::{GenerateOptions, RouterConfig, Studio};
//!
//! # async fn run() -> Result<(), modelrouter::RouterError> {
//! let studio = Studio::from_config(RouterConfig::default());
//! studio.start().await;
//!
//! let response = studio
//!     .generate("Explain borrowing in one sentence", GenerateOptions::default())
//!     .await?;
//! println!("{} ({})", response.text, response.provider);
//! # Ok(())
//! # }
//! ```

pub mod benchmark;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod hardware;
pub mod progress;
pub mod providers;
pub mod recommend;
pub mod registry;
pub mod router;
pub mod studio;
pub mod util;

pub use benchmark::{BenchmarkOrchestrator, BenchmarkResult, BenchmarkRun};
pub use catalog::{CatalogItem, FavoritesStore, ModelCatalog, ModelCatalogEntry, UseCase};
pub use config::{ConfigError, RouterConfig};
pub use error::{FailedAttempt, RouterError};
pub use hardware::{GpuInfo, GpuKind, HardwareProfile, HardwareProfiler};
pub use progress::{ProgressEvent, ProgressHandler};
pub use providers::{
    AdapterError, GenerateRequest, GenerateResponse, Provider, ProviderAdapter, ProviderKind,
    ProviderSnapshot,
};
pub use recommend::{recommend, HardwarePolicy, Priority, Recommendation, RecommendationSet};
pub use registry::{DiscoveryTask, ProviderRegistry};
pub use router::{ActiveModel, FallbackRouter, GenerateOptions, RouterStatus};
pub use studio::Studio;
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_modelrouter() {
        assert_eq!(NAME, "modelrouter");
    }
}
