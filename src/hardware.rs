//! Host hardware profiling
//!
//! [`HardwareProfiler::detect`] reads CPU, RAM and GPU capability once and
//! caches the snapshot until the next explicit call. A subsystem that cannot be
//! read leaves its field empty instead of failing the whole profile.

use serde::{Deserialize, Serialize};
use std::process::Command;
use std::sync::Arc;
use sysinfo::System;
use tokio::sync::watch;
use tracing::{debug, info};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuKind {
    Nvidia,
    /// GPU shares system memory
    AppleSilicon,
}

impl std::fmt::Display for GpuKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuKind::Nvidia => write!(f, "NVIDIA"),
            GpuKind::AppleSilicon => write!(f, "Apple Silicon"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub kind: GpuKind,
    /// Dedicated (or unified) memory, when the driver reports it
    pub vram_bytes: Option<u64>,
    pub unified_memory: bool,
}

/// Immutable snapshot of host compute capability.
///
/// Equality compares installed capability only. `available_ram_bytes` is a
/// point-in-time reading that moves on every call, so two detections of the
/// same machine compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareProfile {
    pub cpu_cores: Option<usize>,
    pub total_ram_bytes: Option<u64>,
    pub available_ram_bytes: Option<u64>,
    pub gpu: Option<GpuInfo>,
}

impl PartialEq for HardwareProfile {
    fn eq(&self, other: &Self) -> bool {
        self.cpu_cores == other.cpu_cores
            && self.total_ram_bytes == other.total_ram_bytes
            && self.gpu == other.gpu
    }
}

impl Eq for HardwareProfile {}

impl HardwareProfile {
    pub fn total_ram_gb(&self) -> Option<f64> {
        self.total_ram_bytes.map(|b| b as f64 / GIB)
    }

    pub fn available_ram_gb(&self) -> Option<f64> {
        self.available_ram_bytes.map(|b| b as f64 / GIB)
    }

    pub fn vram_gb(&self) -> Option<f64> {
        self.gpu
            .as_ref()
            .and_then(|g| g.vram_bytes)
            .map(|b| b as f64 / GIB)
    }

    pub fn has_gpu(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn unified_memory(&self) -> bool {
        self.gpu.as_ref().map(|g| g.unified_memory).unwrap_or(false)
    }
}

impl std::fmt::Display for HardwareProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let gb = |v: Option<f64>| v.map_or("unknown".to_string(), |g| format!("{:.1} GB", g));
        writeln!(
            f,
            "CPU cores: {}",
            self.cpu_cores
                .map_or("unknown".to_string(), |c| c.to_string())
        )?;
        writeln!(f, "RAM total: {}", gb(self.total_ram_gb()))?;
        writeln!(f, "RAM available: {}", gb(self.available_ram_gb()))?;
        match &self.gpu {
            Some(gpu) => write!(f, "GPU: {} ({})", gpu.kind, gb(self.vram_gb())),
            None => write!(f, "GPU: none"),
        }
    }
}

/// Source of raw hardware readings
pub trait HardwareProbe: Send + Sync {
    fn cpu_cores(&self) -> Option<usize>;

    /// `(total, available)` in bytes
    fn memory(&self) -> Option<(u64, u64)>;

    fn gpu(&self) -> Option<GpuInfo>;
}

/// Reads the live system through `sysinfo` and the GPU vendor tools
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl HardwareProbe for SystemProbe {
    fn cpu_cores(&self) -> Option<usize> {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        match sys.cpus().len() {
            0 => None,
            n => Some(n),
        }
    }

    fn memory(&self) -> Option<(u64, u64)> {
        let mut sys = System::new();
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return None;
        }
        Some((total, sys.available_memory()))
    }

    fn gpu(&self) -> Option<GpuInfo> {
        if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
            return self.memory().map(|(total, _)| GpuInfo {
                kind: GpuKind::AppleSilicon,
                vram_bytes: Some(total),
                unified_memory: true,
            });
        }
        detect_nvidia()
    }
}

fn detect_nvidia() -> Option<GpuInfo> {
    let output = Command::new("nvidia-smi")
        .arg("--query-gpu=memory.total")
        .arg("--format=csv,noheader,nounits")
        .output()
        .map_err(|e| debug!("nvidia-smi not available: {}", e))
        .ok()?;

    if !output.status.success() {
        debug!("nvidia-smi exited with {}", output.status);
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Some(GpuInfo {
        kind: GpuKind::Nvidia,
        vram_bytes: parse_nvidia_memory(&stdout),
        unified_memory: false,
    })
}

/// Largest per-device value from `nvidia-smi` MiB output, in bytes
fn parse_nvidia_memory(output: &str) -> Option<u64> {
    output
        .lines()
        .filter_map(|line| line.trim().parse::<u64>().ok())
        .max()
        .map(|mib| mib * 1024 * 1024)
}

/// Caches the latest [`HardwareProfile`]
pub struct HardwareProfiler {
    probe: Arc<dyn HardwareProbe>,
    latest: watch::Sender<Option<HardwareProfile>>,
}

impl HardwareProfiler {
    pub fn new(probe: Arc<dyn HardwareProbe>) -> Self {
        let (latest, _) = watch::channel(None);
        Self { probe, latest }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemProbe))
    }

    /// Reads the hardware and replaces the cached snapshot.
    ///
    /// Blocking: shells out to vendor tools. Run it off the async executor.
    pub fn detect(&self) -> HardwareProfile {
        let memory = self.probe.memory();
        let profile = HardwareProfile {
            cpu_cores: self.probe.cpu_cores(),
            total_ram_bytes: memory.map(|(total, _)| total),
            available_ram_bytes: memory.map(|(_, available)| available),
            gpu: self.probe.gpu(),
        };

        info!(
            cpu_cores = ?profile.cpu_cores,
            total_ram_gb = ?profile.total_ram_gb(),
            gpu = ?profile.gpu.as_ref().map(|g| g.kind),
            "Hardware detected"
        );

        self.latest.send_replace(Some(profile.clone()));
        profile
    }

    /// Last detected profile, `None` before the first [`detect`](Self::detect)
    pub fn snapshot(&self) -> Option<HardwareProfile> {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<HardwareProfile>> {
        self.latest.subscribe()
    }
}

impl std::fmt::Debug for HardwareProfiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareProfiler")
            .field("latest", &*self.latest.borrow())
            .finish()
    }
}

/// Probe returning fixed readings
#[derive(Debug, Clone, Default)]
pub struct FixedProbe {
    pub cpu_cores: Option<usize>,
    pub memory: Option<(u64, u64)>,
    pub gpu: Option<GpuInfo>,
}

impl FixedProbe {
    /// CPU-only host with `ram_gb` of RAM, half of it free
    pub fn with_ram_gb(ram_gb: u64) -> Self {
        let total = ram_gb * 1024 * 1024 * 1024;
        Self {
            cpu_cores: Some(8),
            memory: Some((total, total / 2)),
            gpu: None,
        }
    }

    pub fn with_gpu(mut self, kind: GpuKind, vram_gb: u64) -> Self {
        self.gpu = Some(GpuInfo {
            kind,
            vram_bytes: Some(vram_gb * 1024 * 1024 * 1024),
            unified_memory: kind == GpuKind::AppleSilicon,
        });
        self
    }
}

impl HardwareProbe for FixedProbe {
    fn cpu_cores(&self) -> Option<usize> {
        self.cpu_cores
    }

    fn memory(&self) -> Option<(u64, u64)> {
        self.memory
    }

    fn gpu(&self) -> Option<GpuInfo> {
        self.gpu.clone()
    }
}
