//! Tunable defaults from §6.3, grouped one struct per subsystem and composed
//! into [`CoreConfig`], mirroring the ancestor codebase's `ServerConfig` /
//! `ConnectionConfig` / `PingConfig` composition. `serde` derives let a host
//! application load these from whatever file format it prefers; the core
//! itself never touches a filesystem.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// `lifecycle.timeout_ticks` — construction/destruction timeout.
    pub timeout_ticks: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self { timeout_ticks: 300 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostConfig {
    /// `ghost.max_age_ticks` — stale-ghost destroy threshold.
    pub max_age_ticks: u64,
    /// `ghost.promotion_budget_ns` — per-frame promotion budget.
    pub promotion_budget_ns: u64,
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            max_age_ticks: 3600,
            promotion_budget_ns: 2_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EgressConfig {
    /// `egress.refresh_interval_ticks` (R) — rolling refresh period.
    pub refresh_interval_ticks: u64,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ticks: 600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdAllocatorConfig {
    /// `id.low_water` (L) — refill trigger threshold.
    pub low_water: u32,
    /// `id.request_timeout_ticks` — retry period.
    pub request_timeout_ticks: u64,
    /// Maximum exponential-backoff retry attempts before giving up a block
    /// request (fixed at 3 by §4.A, kept configurable for tests).
    pub max_retry_attempts: u32,
}

impl Default for IdAllocatorConfig {
    fn default() -> Self {
        Self {
            low_water: 10,
            request_timeout_ticks: 60,
            max_retry_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// `registry.graveyard_ticks` (G) — id cooldown.
    pub graveyard_ticks: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            graveyard_ticks: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// `time.pll_gain` (K_p) — PLL proportional gain.
    pub pll_gain: f64,
    /// `time.max_slew` (K_slew) — PLL slew clamp.
    pub max_slew: f64,
    /// `time.snap_threshold_ms` (S_snap) — hard-snap threshold.
    pub snap_threshold_ms: f64,
    /// `time.jitter_window` (W_jitter) — median filter size.
    pub jitter_window: usize,
    /// `time.avg_latency_ticks` — network-latency estimate, expressed here
    /// in seconds (host monotonic default ~2 ms).
    pub avg_latency_s: f64,
    /// `time.fixed_delta_s` — lockstep frame duration.
    pub fixed_delta_s: f32,
    /// `time.pause_barrier_frames` (F_barrier) — mode-switch lookahead.
    pub pause_barrier_frames: u64,
    /// `time.pulse_interval` (P_pulse) — continuous pulse period, seconds.
    pub pulse_interval_s: f64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            pll_gain: 0.1,
            max_slew: 0.05,
            snap_threshold_ms: 500.0,
            jitter_window: 5,
            avg_latency_s: 0.002,
            fixed_delta_s: 1.0 / 60.0,
            pause_barrier_frames: 10,
            pulse_interval_s: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub lifecycle: LifecycleConfig,
    pub ghost: GhostConfig,
    pub egress: EgressConfig,
    pub id_allocator: IdAllocatorConfig,
    pub registry: RegistryConfig,
    pub time: TimeConfig,
}
