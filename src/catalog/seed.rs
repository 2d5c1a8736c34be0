//! Built-in catalog entries, in display order

use super::ModelCatalogEntry;
use crate::providers::ProviderKind;

/// Compile-time description of one known model
#[derive(Debug, Clone, Copy)]
pub struct SeedEntry {
    pub id: &'static str,
    pub display_name: &'static str,
    pub provider: ProviderKind,
    /// Download size; 0 for cloud-hosted models
    pub size_gb: f64,
    pub quantization: &'static str,
    pub context_window: u32,
    pub min_ram_gb: f64,
    pub min_vram_gb: Option<f64>,
    pub tags: &'static [&'static str],
    pub strengths: &'static [&'static str],
    pub limitations: &'static [&'static str],
    pub pull_command: Option<&'static str>,
    pub download_url: Option<&'static str>,
}

impl SeedEntry {
    pub fn to_entry(&self) -> ModelCatalogEntry {
        ModelCatalogEntry::new(
            self.id,
            self.display_name,
            self.provider,
            self.size_gb,
            self.quantization,
            self.context_window,
            self.min_ram_gb,
            self.min_vram_gb,
            self.tags.iter().map(|t| t.to_string()).collect(),
        )
        .with_notes(
            self.strengths.iter().map(|s| s.to_string()).collect(),
            self.limitations.iter().map(|s| s.to_string()).collect(),
        )
        .with_pull(
            self.pull_command.map(str::to_string),
            self.download_url.map(str::to_string),
        )
    }
}

pub const SEED: &[SeedEntry] = &[
    SeedEntry {
        id: "qwen2.5-coder:7b",
        display_name: "Qwen2.5-Coder 7B",
        provider: ProviderKind::Ollama,
        size_gb: 4.7,
        quantization: "Q4_K_M",
        context_window: 32_768,
        min_ram_gb: 8.0,
        min_vram_gb: None,
        tags: &["code", "local"],
        strengths: &["Strong code completion for its size", "Runs on most laptops"],
        limitations: &["Weaker at long-form prose"],
        pull_command: Some("ollama pull qwen2.5-coder:7b"),
        download_url: Some("https://ollama.com/library/qwen2.5-coder"),
    },
    SeedEntry {
        id: "llama3.1:8b",
        display_name: "Llama 3.1 8B",
        provider: ProviderKind::Ollama,
        size_gb: 4.9,
        quantization: "Q4_K_M",
        context_window: 131_072,
        min_ram_gb: 8.0,
        min_vram_gb: None,
        tags: &["general", "chat", "local"],
        strengths: &["Good all-rounder", "Long context window"],
        limitations: &["Limited multi-step reasoning"],
        pull_command: Some("ollama pull llama3.1:8b"),
        download_url: Some("https://ollama.com/library/llama3.1"),
    },
    SeedEntry {
        id: "phi3:mini",
        display_name: "Phi-3 Mini",
        provider: ProviderKind::Ollama,
        size_gb: 2.2,
        quantization: "Q4_0",
        context_window: 4_096,
        min_ram_gb: 4.0,
        min_vram_gb: None,
        tags: &["chat", "general", "local"],
        strengths: &["Very fast on CPU", "Small download"],
        limitations: &["Short context", "Shallow knowledge"],
        pull_command: Some("ollama pull phi3:mini"),
        download_url: Some("https://ollama.com/library/phi3"),
    },
    SeedEntry {
        id: "mistral:7b",
        display_name: "Mistral 7B",
        provider: ProviderKind::Ollama,
        size_gb: 4.1,
        quantization: "Q4_0",
        context_window: 32_768,
        min_ram_gb: 8.0,
        min_vram_gb: None,
        tags: &["chat", "writing", "local"],
        strengths: &["Fluent writing", "Fast"],
        limitations: &["Average at code"],
        pull_command: Some("ollama pull mistral:7b"),
        download_url: Some("https://ollama.com/library/mistral"),
    },
    SeedEntry {
        id: "deepseek-r1:14b",
        display_name: "DeepSeek-R1 14B",
        provider: ProviderKind::Ollama,
        size_gb: 9.0,
        quantization: "Q4_K_M",
        context_window: 131_072,
        min_ram_gb: 16.0,
        min_vram_gb: None,
        tags: &["reasoning", "code", "local"],
        strengths: &["Step-by-step reasoning", "Good at math"],
        limitations: &["Verbose thinking output", "Slow first token"],
        pull_command: Some("ollama pull deepseek-r1:14b"),
        download_url: Some("https://ollama.com/library/deepseek-r1"),
    },
    SeedEntry {
        id: "gemma2:27b",
        display_name: "Gemma 2 27B",
        provider: ProviderKind::Ollama,
        size_gb: 16.0,
        quantization: "Q4_0",
        context_window: 8_192,
        min_ram_gb: 32.0,
        min_vram_gb: None,
        tags: &["general", "writing", "local"],
        strengths: &["High quality prose"],
        limitations: &["Short context", "Needs a large machine"],
        pull_command: Some("ollama pull gemma2:27b"),
        download_url: Some("https://ollama.com/library/gemma2"),
    },
    SeedEntry {
        id: "codellama:34b",
        display_name: "Code Llama 34B",
        provider: ProviderKind::Ollama,
        size_gb: 19.0,
        quantization: "Q4_0",
        context_window: 16_384,
        min_ram_gb: 32.0,
        min_vram_gb: Some(24.0),
        tags: &["code", "local"],
        strengths: &["Large code model", "Infilling support"],
        limitations: &["Requires a 24 GB GPU"],
        pull_command: Some("ollama pull codellama:34b"),
        download_url: Some("https://ollama.com/library/codellama"),
    },
    SeedEntry {
        id: "llama3.1:70b",
        display_name: "Llama 3.1 70B",
        provider: ProviderKind::Ollama,
        size_gb: 40.0,
        quantization: "Q4_K_M",
        context_window: 131_072,
        min_ram_gb: 64.0,
        min_vram_gb: Some(48.0),
        tags: &["general", "reasoning", "local"],
        strengths: &["Near frontier quality offline"],
        limitations: &["Workstation-class hardware only"],
        pull_command: Some("ollama pull llama3.1:70b"),
        download_url: Some("https://ollama.com/library/llama3.1"),
    },
    SeedEntry {
        id: "qwen2.5-coder-14b-instruct",
        display_name: "Qwen2.5-Coder 14B (LM Studio)",
        provider: ProviderKind::LmStudio,
        size_gb: 9.0,
        quantization: "Q4_K_M",
        context_window: 32_768,
        min_ram_gb: 16.0,
        min_vram_gb: None,
        tags: &["code", "local"],
        strengths: &["Better code quality than the 7B"],
        limitations: &["Must be downloaded from the LM Studio UI"],
        pull_command: None,
        download_url: Some("https://lmstudio.ai/models"),
    },
    SeedEntry {
        id: "claude-sonnet-4-5",
        display_name: "Claude Sonnet 4.5",
        provider: ProviderKind::Anthropic,
        size_gb: 0.0,
        quantization: "cloud",
        context_window: 200_000,
        min_ram_gb: 0.0,
        min_vram_gb: None,
        tags: &["code", "reasoning", "writing", "cloud"],
        strengths: &["Top-tier coding", "Long context"],
        limitations: &["Requires an API key", "Paid per token"],
        pull_command: None,
        download_url: None,
    },
    SeedEntry {
        id: "claude-haiku-4-5",
        display_name: "Claude Haiku 4.5",
        provider: ProviderKind::Anthropic,
        size_gb: 0.0,
        quantization: "cloud",
        context_window: 200_000,
        min_ram_gb: 0.0,
        min_vram_gb: None,
        tags: &["chat", "code", "cloud"],
        strengths: &["Fast and cheap"],
        limitations: &["Requires an API key"],
        pull_command: None,
        download_url: None,
    },
    SeedEntry {
        id: "gpt-4o",
        display_name: "GPT-4o",
        provider: ProviderKind::OpenAI,
        size_gb: 0.0,
        quantization: "cloud",
        context_window: 128_000,
        min_ram_gb: 0.0,
        min_vram_gb: None,
        tags: &["general", "chat", "writing", "cloud"],
        strengths: &["Strong generalist", "Multimodal"],
        limitations: &["Requires an API key", "Paid per token"],
        pull_command: None,
        download_url: None,
    },
    SeedEntry {
        id: "gpt-4o-mini",
        display_name: "GPT-4o mini",
        provider: ProviderKind::OpenAI,
        size_gb: 0.0,
        quantization: "cloud",
        context_window: 128_000,
        min_ram_gb: 0.0,
        min_vram_gb: None,
        tags: &["chat", "cloud"],
        strengths: &["Low latency", "Cheap"],
        limitations: &["Requires an API key"],
        pull_command: None,
        download_url: None,
    },
    SeedEntry {
        id: "gemini-2.5-pro",
        display_name: "Gemini 2.5 Pro",
        provider: ProviderKind::Gemini,
        size_gb: 0.0,
        quantization: "cloud",
        context_window: 1_048_576,
        min_ram_gb: 0.0,
        min_vram_gb: None,
        tags: &["reasoning", "code", "cloud"],
        strengths: &["Million-token context", "Strong reasoning"],
        limitations: &["Requires an API key"],
        pull_command: None,
        download_url: None,
    },
    SeedEntry {
        id: "gemini-2.5-flash",
        display_name: "Gemini 2.5 Flash",
        provider: ProviderKind::Gemini,
        size_gb: 0.0,
        quantization: "cloud",
        context_window: 1_048_576,
        min_ram_gb: 0.0,
        min_vram_gb: None,
        tags: &["chat", "general", "cloud"],
        strengths: &["Fast", "Long context"],
        limitations: &["Requires an API key"],
        pull_command: None,
        download_url: None,
    },
    SeedEntry {
        id: "llama-3.3-70b-versatile",
        display_name: "Llama 3.3 70B (Groq)",
        provider: ProviderKind::Groq,
        size_gb: 0.0,
        quantization: "cloud",
        context_window: 131_072,
        min_ram_gb: 0.0,
        min_vram_gb: None,
        tags: &["general", "chat", "cloud"],
        strengths: &["Very high tokens/sec"],
        limitations: &["Requires an API key", "Rate limited on free tier"],
        pull_command: None,
        download_url: None,
    },
    SeedEntry {
        id: "llama-3.1-8b-instant",
        display_name: "Llama 3.1 8B Instant (Groq)",
        provider: ProviderKind::Groq,
        size_gb: 0.0,
        quantization: "cloud",
        context_window: 131_072,
        min_ram_gb: 0.0,
        min_vram_gb: None,
        tags: &["chat", "cloud"],
        strengths: &["Lowest latency option"],
        limitations: &["Small model quality"],
        pull_command: None,
        download_url: None,
    },
];

pub fn seed_entries() -> Vec<ModelCatalogEntry> {
    SEED.iter().map(SeedEntry::to_entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_seed_ids_unique() {
        let ids: HashSet<&str> = SEED.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), SEED.len());
    }

    #[test]
    fn test_cloud_entries_have_no_size() {
        for seed in SEED.iter().filter(|s| !s.provider.is_local()) {
            assert_eq!(seed.size_gb, 0.0, "{}", seed.id);
            assert!(seed.pull_command.is_none(), "{}", seed.id);
        }
    }

    #[test]
    fn test_every_seed_has_a_use_case() {
        for entry in seed_entries() {
            assert!(!entry.use_cases.is_empty(), "{}", entry.id);
        }
    }
}
