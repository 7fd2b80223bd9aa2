//! Continuous-mode clock sync (§4.G.1): a master free-running on wall time,
//! a slave phase-locking to periodic pulses via a median-filtered error
//! estimator. The median/outlier-tolerant filtering here follows the same
//! shape as a `RttEstimator`-style jitter filter: keep a bounded window,
//! sort it, take the middle sample.

use std::collections::VecDeque;

use crate::config::TimeConfig;

use super::tick::TickInfo;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimePulse {
    pub master_wall_ns: u64,
    pub sim_time_s: f64,
    pub scale: f32,
    pub sequence: u64,
}

pub struct ContinuousMaster {
    config: TimeConfig,
    total_time_s: f64,
    scale: f32,
    frame_number: u64,
    last_pulse_wall_ns: Option<u64>,
    sequence: u64,
}

impl ContinuousMaster {
    pub fn new(config: TimeConfig) -> Self {
        Self {
            config,
            total_time_s: 0.0,
            scale: 1.0,
            frame_number: 0,
            last_pulse_wall_ns: None,
            sequence: 0,
        }
    }

    pub fn tick(&mut self, now_wall_ns: u64, delta_s: f32) -> (TickInfo, Option<TimePulse>) {
        self.total_time_s += delta_s as f64 * self.scale as f64;
        self.frame_number += 1;

        let due = match self.last_pulse_wall_ns {
            None => true,
            Some(last) => {
                (now_wall_ns.saturating_sub(last) as f64 / 1e9) >= self.config.pulse_interval_s
            }
        };

        let pulse = if due {
            self.last_pulse_wall_ns = Some(now_wall_ns);
            self.sequence += 1;
            Some(TimePulse {
                master_wall_ns: now_wall_ns,
                sim_time_s: self.total_time_s,
                scale: self.scale,
                sequence: self.sequence,
            })
        } else {
            None
        };

        (
            TickInfo {
                frame_number: self.frame_number,
                total_time_s: self.total_time_s,
                delta_s,
                scale: self.scale,
            },
            pulse,
        )
    }

    /// Changing scale forces an immediate pulse so slaves don't wait a full
    /// `P_pulse` to notice.
    pub fn set_scale(&mut self, scale: f32, now_wall_ns: u64) -> TimePulse {
        self.scale = scale;
        self.last_pulse_wall_ns = Some(now_wall_ns);
        self.sequence += 1;
        TimePulse {
            master_wall_ns: now_wall_ns,
            sim_time_s: self.total_time_s,
            scale,
            sequence: self.sequence,
        }
    }

    pub fn total_time_s(&self) -> f64 {
        self.total_time_s
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }
}

pub struct ContinuousSlave {
    config: TimeConfig,
    virtual_wall_ns: u64,
    total_time_s: f64,
    scale: f32,
    frame_number: u64,
    last_now_local_ns: Option<u64>,
    error_window_ms: VecDeque<f64>,
}

impl ContinuousSlave {
    pub fn new(config: TimeConfig) -> Self {
        Self {
            config,
            virtual_wall_ns: 0,
            total_time_s: 0.0,
            scale: 1.0,
            frame_number: 0,
            last_now_local_ns: None,
            error_window_ms: VecDeque::new(),
        }
    }

    /// Ingest a pulse from the master, sampled at `now_local_ns`.
    pub fn on_pulse(&mut self, pulse: &TimePulse, now_local_ns: u64) {
        self.scale = pulse.scale;

        let avg_latency_ns = self.config.avg_latency_s * 1e9;
        let target_local = now_local_ns as f64 + avg_latency_ns;
        let error_ns = target_local - self.virtual_wall_ns as f64;
        let error_ms = error_ns / 1e6;

        self.error_window_ms.push_back(error_ms);
        while self.error_window_ms.len() > self.config.jitter_window {
            self.error_window_ms.pop_front();
        }

        if error_ms.abs() > self.config.snap_threshold_ms {
            self.virtual_wall_ns = target_local.max(0.0) as u64;
            self.total_time_s = pulse.sim_time_s
                + (now_local_ns as f64 - pulse.master_wall_ns as f64) / 1e9
                - self.config.avg_latency_s;
            self.error_window_ms.clear();
        }
    }

    fn median_error_ms(&self) -> f64 {
        if self.error_window_ms.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.error_window_ms.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        sorted[sorted.len() / 2]
    }

    pub fn tick(&mut self, now_local_ns: u64) -> TickInfo {
        let raw_delta_ns = match self.last_now_local_ns {
            Some(last) => now_local_ns.saturating_sub(last),
            None => 0,
        };
        self.last_now_local_ns = Some(now_local_ns);

        let raw_delta_s = raw_delta_ns as f64 / 1e9;
        let correction = (self.median_error_ms() / 1000.0 * self.config.pll_gain)
            .clamp(-self.config.max_slew, self.config.max_slew);
        let adj_delta_s = raw_delta_s * (1.0 + correction);

        self.virtual_wall_ns = self
            .virtual_wall_ns
            .saturating_add((adj_delta_s * 1e9).max(0.0) as u64);
        self.total_time_s += adj_delta_s * self.scale as f64;
        self.frame_number += 1;

        TickInfo {
            frame_number: self.frame_number,
            total_time_s: self.total_time_s,
            delta_s: adj_delta_s as f32,
            scale: self.scale,
        }
    }

    pub fn total_time_s(&self) -> f64 {
        self.total_time_s
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_emits_pulse_once_per_interval_and_accumulates_time() {
        let mut master = ContinuousMaster::new(TimeConfig {
            pulse_interval_s: 1.0,
            ..Default::default()
        });
        let (tick1, pulse1) = master.tick(0, 1.0 / 60.0);
        assert!(pulse1.is_some());
        assert_eq!(tick1.frame_number, 1);

        let (_, pulse2) = master.tick(100_000_000, 1.0 / 60.0);
        assert!(pulse2.is_none());

        let (_, pulse3) = master.tick(1_100_000_000, 1.0 / 60.0);
        assert!(pulse3.is_some());
    }

    #[test]
    fn slave_hard_snaps_on_large_error() {
        let mut slave = ContinuousSlave::new(TimeConfig::default());
        let pulse = TimePulse {
            master_wall_ns: 0,
            sim_time_s: 10.0,
            scale: 1.0,
            sequence: 1,
        };
        slave.on_pulse(&pulse, 2_000_000_000); // 2s ahead: way past snap threshold
        assert!((slave.total_time_s() - (10.0 + 2.0 - slave_avg_latency())).abs() < 0.01);
    }

    fn slave_avg_latency() -> f64 {
        TimeConfig::default().avg_latency_s
    }

    #[test]
    fn median_filter_tolerates_outliers_without_snapping() {
        let mut slave = ContinuousSlave::new(TimeConfig::default());
        for i in 0..5u64 {
            let pulse = TimePulse {
                master_wall_ns: i * 1_000_000_000,
                sim_time_s: i as f64,
                scale: 1.0,
                sequence: i,
            };
            slave.on_pulse(&pulse, i * 1_000_000_000);
        }
        // small, consistent errors should not trigger a hard snap
        assert!(slave.error_window_ms.len() <= 5);
    }
}
