//! Model recommendation scoring
//!
//! [`recommend`] is a pure function of its inputs. Scoring, in order:
//!
//! 1. base score: 50 when the entry is tagged for the use case, 20 otherwise
//! 2. hardware gate: entries whose RAM or VRAM minimum exceeds the host are
//!    dropped ([`HardwarePolicy::Exclude`]) or multiplied by 0.1
//!    ([`HardwarePolicy::Penalize`]); cloud entries always pass
//! 3. priority multiplier ([`Priority::multiplier`])
//! 4. +25 when a reachable provider serves the model
//! 5. stable descending sort, ties keep catalog order

use crate::catalog::{ModelCatalogEntry, UseCase};
use crate::hardware::HardwareProfile;
use crate::providers::{ProviderKind, ProviderSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const USE_CASE_MATCH_SCORE: f64 = 50.0;
const USE_CASE_MISS_SCORE: f64 = 20.0;
const HARDWARE_PENALTY: f64 = 0.1;
const PRIORITY_BOOST: f64 = 1.3;
const SPEED_MISS: f64 = 0.8;
const QUALITY_MISS: f64 = 0.9;
const SMALL_MODEL_GB: f64 = 5.0;
const LARGE_MODEL_GB: f64 = 10.0;
const AVAILABILITY_BONUS: f64 = 25.0;
const MAX_RATIONALE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Speed,
    #[default]
    Balanced,
    Quality,
}

impl Priority {
    pub fn multiplier(&self, entry: &ModelCatalogEntry) -> f64 {
        match self {
            Priority::Speed => {
                if entry.size_gb <= SMALL_MODEL_GB || entry.is_quantized() {
                    PRIORITY_BOOST
                } else {
                    SPEED_MISS
                }
            }
            Priority::Quality => {
                if entry.size_gb >= LARGE_MODEL_GB || entry.is_full_precision() || entry.is_cloud()
                {
                    PRIORITY_BOOST
                } else {
                    QUALITY_MISS
                }
            }
            Priority::Balanced => 1.0,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Speed => write!(f, "speed"),
            Priority::Balanced => write!(f, "balanced"),
            Priority::Quality => write!(f, "quality"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "speed" | "fast" => Ok(Priority::Speed),
            "balanced" => Ok(Priority::Balanced),
            "quality" => Ok(Priority::Quality),
            other => Err(format!(
                "Invalid priority: {}. Valid options: speed, balanced, quality",
                other
            )),
        }
    }
}

/// What to do with entries the host cannot run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwarePolicy {
    #[default]
    Exclude,
    Penalize,
}

impl fmt::Display for HardwarePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwarePolicy::Exclude => write!(f, "exclude"),
            HardwarePolicy::Penalize => write!(f, "penalize"),
        }
    }
}

impl FromStr for HardwarePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exclude" => Ok(HardwarePolicy::Exclude),
            "penalize" | "penalise" => Ok(HardwarePolicy::Penalize),
            other => Err(format!(
                "Invalid hardware policy: {}. Valid options: exclude, penalize",
                other
            )),
        }
    }
}

/// Live availability of one model at scoring time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
    /// Preferred reachable provider serving the model
    pub provider: Option<ProviderKind>,
    /// Served by a reachable local runtime
    pub installed: bool,
}

impl Availability {
    pub fn from_snapshot(entry: &ModelCatalogEntry, snapshot: &ProviderSnapshot) -> Self {
        let serving = entry.serving_providers(snapshot);
        Self {
            available: !serving.is_empty(),
            provider: serving.first().copied(),
            installed: serving.iter().any(|k| k.is_local()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub model_id: String,
    pub entry: ModelCatalogEntry,
    pub availability: Availability,
    pub score: f64,
    pub rationale: Vec<String>,
}

/// One scoring pass, tied to the provider snapshot it was computed from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationSet {
    /// Provider snapshot generation the availability fields reflect
    pub generation: u64,
    pub computed_at: DateTime<Utc>,
    pub use_case: UseCase,
    pub priority: Priority,
    pub items: Vec<Recommendation>,
}

impl RecommendationSet {
    /// A set scored against an older snapshot must be recomputed, not patched
    pub fn is_stale(&self, current_generation: u64) -> bool {
        self.generation != current_generation
    }

    pub fn top(&self) -> Option<&Recommendation> {
        self.items.first()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum HardwareFit {
    Cloud,
    Fits(String),
    Exceeds(String),
    Unknown,
}

fn hardware_fit(entry: &ModelCatalogEntry, hardware: Option<&HardwareProfile>) -> HardwareFit {
    if entry.is_cloud() {
        return HardwareFit::Cloud;
    }
    let Some(hw) = hardware else {
        return HardwareFit::Unknown;
    };

    if let Some(total) = hw.total_ram_gb() {
        if entry.min_ram_gb > total {
            return HardwareFit::Exceeds(format!(
                "Needs {:.0} GB RAM, host has {:.0} GB",
                entry.min_ram_gb, total
            ));
        }
    }

    if let Some(need) = entry.min_vram_gb {
        match hw.vram_gb() {
            Some(have) if have >= need => {}
            Some(have) => {
                return HardwareFit::Exceeds(format!(
                    "Needs {:.0} GB VRAM, GPU has {:.0} GB",
                    need, have
                ))
            }
            None => {
                return HardwareFit::Exceeds(format!("Needs a GPU with {:.0} GB VRAM", need))
            }
        }
    }

    match hw.total_ram_gb() {
        Some(total) => HardwareFit::Fits(format!(
            "Fits this machine ({:.0} GB needed of {:.0} GB RAM)",
            entry.min_ram_gb, total
        )),
        None => HardwareFit::Unknown,
    }
}

/// Scores and ranks `catalog` for a use case and priority.
///
/// Deterministic for a given input tuple apart from `computed_at`.
pub fn recommend(
    use_case: UseCase,
    priority: Priority,
    hardware: Option<&HardwareProfile>,
    catalog: &[ModelCatalogEntry],
    providers: &ProviderSnapshot,
    policy: HardwarePolicy,
) -> RecommendationSet {
    let mut items = Vec::with_capacity(catalog.len());

    for entry in catalog {
        let mut rationale = Vec::with_capacity(MAX_RATIONALE);

        let matches = entry.matches_use_case(use_case);
        let mut score = if matches {
            rationale.push(format!("Suited to {}", use_case));
            USE_CASE_MATCH_SCORE
        } else {
            rationale.push(format!("Not specialised for {}", use_case));
            USE_CASE_MISS_SCORE
        };

        match hardware_fit(entry, hardware) {
            HardwareFit::Exceeds(reason) => match policy {
                HardwarePolicy::Exclude => continue,
                HardwarePolicy::Penalize => {
                    score *= HARDWARE_PENALTY;
                    rationale.push(reason);
                }
            },
            HardwareFit::Fits(reason) => rationale.push(reason),
            HardwareFit::Cloud => rationale.push("Cloud-hosted, no local hardware needed".into()),
            HardwareFit::Unknown => rationale.push("Hardware requirements not checked".into()),
        }

        score *= priority.multiplier(entry);

        let availability = Availability::from_snapshot(entry, providers);
        if let Some(provider) = availability.provider {
            score += AVAILABILITY_BONUS;
            rationale.push(format!("Available now via {}", provider));
        } else if entry.is_cloud() {
            rationale.push(format!("{} is not reachable or not configured", entry.provider));
        } else {
            rationale.push(match &entry.pull_command {
                Some(cmd) => format!("Not installed; run `{}`", cmd),
                None => "Not installed".to_string(),
            });
        }

        rationale.truncate(MAX_RATIONALE);
        items.push(Recommendation {
            model_id: entry.id.clone(),
            entry: entry.clone(),
            availability,
            score,
            rationale,
        });
    }

    // sort_by is stable: equal scores keep catalog order
    items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    RecommendationSet {
        generation: providers.generation,
        computed_at: Utc::now(),
        use_case,
        priority,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{FixedProbe, GpuKind, HardwareProfiler};
    use crate::providers::{AdapterError, Provider};
    use std::sync::Arc;
    use std::time::Duration;

    fn entry(id: &str, size: f64, min_ram: f64, tags: &[&str]) -> ModelCatalogEntry {
        ModelCatalogEntry::new(
            id,
            id,
            ProviderKind::Ollama,
            size,
            "Q4_K_M",
            8192,
            min_ram,
            None,
            tags.iter().map(|t| t.to_string()).collect(),
        )
    }

    fn host(ram_gb: u64) -> HardwareProfile {
        HardwareProfiler::new(Arc::new(FixedProbe::with_ram_gb(ram_gb))).detect()
    }

    fn empty() -> ProviderSnapshot {
        ProviderSnapshot::default()
    }

    #[test]
    fn test_exclude_policy_drops_oversized_models() {
        let catalog = vec![entry("m1", 4.0, 8.0, &["code"]), entry("m2", 20.0, 32.0, &["general"])];
        let hw = host(16);

        for priority in [Priority::Speed, Priority::Balanced, Priority::Quality] {
            let set = recommend(
                UseCase::Coding,
                priority,
                Some(&hw),
                &catalog,
                &empty(),
                HardwarePolicy::Exclude,
            );
            let ids: Vec<&str> = set.items.iter().map(|r| r.model_id.as_str()).collect();
            assert_eq!(ids, vec!["m1"]);
        }
    }

    #[test]
    fn test_penalize_policy_ranks_oversized_last() {
        let catalog = vec![entry("m2", 20.0, 32.0, &["general"]), entry("m1", 4.0, 8.0, &["code"])];
        let hw = host(16);
        let set = recommend(
            UseCase::Coding,
            Priority::Quality,
            Some(&hw),
            &catalog,
            &empty(),
            HardwarePolicy::Penalize,
        );
        assert_eq!(set.items[0].model_id, "m1");
        assert_eq!(set.items[1].model_id, "m2");
        assert!(set.items[1].rationale.iter().any(|r| r.contains("32 GB RAM")));
    }

    #[test]
    fn test_vram_requirement_needs_gpu() {
        let mut big = entry("big", 19.0, 16.0, &["code"]);
        big.min_vram_gb = Some(24.0);
        let catalog = vec![big];

        let cpu_only = host(64);
        let set = recommend(
            UseCase::Coding,
            Priority::Balanced,
            Some(&cpu_only),
            &catalog,
            &empty(),
            HardwarePolicy::Exclude,
        );
        assert!(set.items.is_empty());

        let gpu = HardwareProfiler::new(Arc::new(
            FixedProbe::with_ram_gb(64).with_gpu(GpuKind::Nvidia, 24),
        ))
        .detect();
        let set = recommend(
            UseCase::Coding,
            Priority::Balanced,
            Some(&gpu),
            &catalog,
            &empty(),
            HardwarePolicy::Exclude,
        );
        assert_eq!(set.items.len(), 1);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let catalog = vec![
            entry("c", 4.0, 4.0, &["chat"]),
            entry("a", 4.0, 4.0, &["chat"]),
            entry("b", 4.0, 4.0, &["chat"]),
        ];
        let set = recommend(
            UseCase::Chat,
            Priority::Balanced,
            None,
            &catalog,
            &empty(),
            HardwarePolicy::Exclude,
        );
        let ids: Vec<&str> = set.items.iter().map(|r| r.model_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_availability_uses_reachable_provider() {
        let mut x = entry("x", 4.0, 4.0, &["chat"]);
        x.provider = ProviderKind::LmStudio;
        let snapshot = ProviderSnapshot {
            generation: 3,
            probed_at: None,
            providers: vec![
                Provider::online(ProviderKind::Ollama, vec!["x".to_string()], Duration::ZERO),
                Provider::offline(
                    ProviderKind::LmStudio,
                    &AdapterError::Unreachable {
                        message: "refused".to_string(),
                    },
                ),
            ],
        };

        let set = recommend(
            UseCase::Chat,
            Priority::Balanced,
            None,
            &[x],
            &snapshot,
            HardwarePolicy::Exclude,
        );
        let rec = &set.items[0];
        assert!(rec.availability.available);
        assert_eq!(rec.availability.provider, Some(ProviderKind::Ollama));
        assert!(rec.availability.installed);
        assert_eq!(set.generation, 3);
        assert!(!set.is_stale(3));
        assert!(set.is_stale(4));
    }

    #[test]
    fn test_available_model_outranks_identical_unavailable() {
        let catalog = vec![entry("off", 4.0, 4.0, &["chat"]), entry("on", 4.0, 4.0, &["chat"])];
        let snapshot = ProviderSnapshot {
            generation: 1,
            probed_at: None,
            providers: vec![Provider::online(
                ProviderKind::Ollama,
                vec!["on".to_string()],
                Duration::ZERO,
            )],
        };
        let set = recommend(
            UseCase::Chat,
            Priority::Balanced,
            None,
            &catalog,
            &snapshot,
            HardwarePolicy::Exclude,
        );
        assert_eq!(set.items[0].model_id, "on");
        assert!((set.items[0].score - set.items[1].score - AVAILABILITY_BONUS).abs() < 1e-9);
    }

    #[test]
    fn test_priority_multipliers() {
        let small = entry("s", 3.0, 4.0, &[]);
        let mut large = entry("l", 40.0, 64.0, &[]);
        large.quantization = "F16".to_string();

        assert_eq!(Priority::Speed.multiplier(&small), PRIORITY_BOOST);
        assert_eq!(Priority::Quality.multiplier(&small), QUALITY_MISS);
        assert_eq!(Priority::Speed.multiplier(&large), SPEED_MISS);
        assert_eq!(Priority::Quality.multiplier(&large), PRIORITY_BOOST);
        assert_eq!(Priority::Balanced.multiplier(&large), 1.0);
    }

    #[test]
    fn test_rationale_capped_at_three() {
        let catalog = vec![entry("m", 4.0, 4.0, &["code"])];
        let set = recommend(
            UseCase::Coding,
            Priority::Speed,
            Some(&host(16)),
            &catalog,
            &empty(),
            HardwarePolicy::Exclude,
        );
        let rationale = &set.items[0].rationale;
        assert_eq!(rationale.len(), 3);
        assert_eq!(rationale[0], "Suited to coding");
    }

    #[test]
    fn test_policy_and_priority_parse() {
        assert_eq!("penalise".parse::<HardwarePolicy>().unwrap(), HardwarePolicy::Penalize);
        assert_eq!(HardwarePolicy::default(), HardwarePolicy::Exclude);
        assert_eq!("QUALITY".parse::<Priority>().unwrap(), Priority::Quality);
        assert!("cheap".parse::<Priority>().is_err());
    }
}
