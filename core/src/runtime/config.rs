//! Loop configuration

use std::time::Duration;

use crate::config::ShellConfig;

/// Loop coordinator configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Fixed tick period in milliseconds
    pub tick_step_ms: u32,
    /// CPU budget warning threshold per tick
    pub cpu_budget: Duration,
    /// Log a timing summary every this many draws (0 disables)
    pub summary_interval: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::with_tick_step(100)
    }
}

impl RuntimeConfig {
    /// Budget defaults to one full tick period
    pub fn with_tick_step(tick_step_ms: u32) -> Self {
        Self {
            tick_step_ms,
            cpu_budget: Duration::from_millis(tick_step_ms as u64),
            summary_interval: 600,
        }
    }

    pub fn from_shell(config: &ShellConfig) -> Self {
        Self::with_tick_step(config.simulation.tick_step_ms)
    }
}
