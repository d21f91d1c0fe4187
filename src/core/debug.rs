//! Pathfinder budget statistics

use std::collections::VecDeque;
use std::time::Duration;

/// Rolling statistics over the pathfinder's per-tick work
#[derive(Debug)]
pub struct BudgetStats {
    /// Time spent searching per update, most recent last
    search_times: VecDeque<Duration>,
    /// Maximum samples to keep
    max_samples: usize,
    /// Average search time per update in milliseconds
    avg_search_time_ms: f32,
    /// Longest search time in the window in milliseconds
    max_search_time_ms: f32,
    /// Updates that ran past their budget
    overruns: u64,
    /// Total `update()` calls
    total_updates: u64,
    /// Total requests resolved
    total_processed: u64,
}

impl BudgetStats {
    /// Create a new stats tracker
    pub fn new() -> Self {
        Self {
            search_times: VecDeque::with_capacity(120),
            max_samples: 120,
            avg_search_time_ms: 0.0,
            max_search_time_ms: 0.0,
            overruns: 0,
            total_updates: 0,
            total_processed: 0,
        }
    }

    /// Record one `update()` call
    pub fn record(&mut self, processed: usize, elapsed: Duration, budget: Duration) {
        self.total_updates += 1;
        self.total_processed += processed as u64;
        if elapsed > budget {
            self.overruns += 1;
        }

        if self.search_times.len() >= self.max_samples {
            self.search_times.pop_front();
        }
        self.search_times.push_back(elapsed);

        self.update_stats();
    }

    fn update_stats(&mut self) {
        if self.search_times.is_empty() {
            return;
        }

        let mut total = Duration::ZERO;
        let mut max = Duration::ZERO;
        for &dt in &self.search_times {
            total += dt;
            max = max.max(dt);
        }

        let count = self.search_times.len() as f32;
        self.avg_search_time_ms = total.as_secs_f32() / count * 1000.0;
        self.max_search_time_ms = max.as_secs_f32() * 1000.0;
    }

    pub fn avg_search_time_ms(&self) -> f32 {
        self.avg_search_time_ms
    }

    pub fn max_search_time_ms(&self) -> f32 {
        self.max_search_time_ms
    }

    /// Updates whose work exceeded the budget
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    pub fn total_updates(&self) -> u64 {
        self.total_updates
    }

    pub fn total_processed(&self) -> u64 {
        self.total_processed
    }

    /// Get a formatted stats string
    pub fn format_stats(&self) -> String {
        format!(
            "Paths: {} in {} updates | Search: {:.3}ms avg, {:.3}ms max | Overruns: {}",
            self.total_processed,
            self.total_updates,
            self.avg_search_time_ms,
            self.max_search_time_ms,
            self.overruns
        )
    }
}

impl Default for BudgetStats {
    fn default() -> Self {
        Self::new()
    }
}
