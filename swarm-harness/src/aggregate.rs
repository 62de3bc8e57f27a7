// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Multi-seed aggregation of scenario runs.
//!
//! Single-seed comparisons are noisy; repeating a scenario across seeds and
//! reporting mean and spread per metric makes strategy differences visible.

use std::fmt::{self, Display};

use crate::{
    sim::{Scenario, run_all},
    strategy::Strategy,
};

/// Per-strategy metrics collected across seeds.
#[derive(Debug, Clone)]
pub struct SeedAggregate {
    /// Strategy display name.
    pub strategy: &'static str,
    /// Overall success percentage per seed.
    pub success_pct: Vec<f64>,
    /// Overall p95 latency per seed, in milliseconds.
    pub p95_ms: Vec<f64>,
    /// Bad-window share to the degraded endpoint per seed, in percent.
    pub bad_share_pct: Vec<f64>,
}

/// Runs the scenario across every seed for every strategy and collects the
/// headline metrics. Results keep the strategy order of `strategies`.
pub fn aggregate_multi_seed(
    scenario: &Scenario,
    strategies: &mut [Box<dyn Strategy>],
    seeds: &[u64],
) -> Vec<SeedAggregate> {
    let mut aggregates: Vec<SeedAggregate> = strategies
        .iter()
        .map(|strategy| SeedAggregate {
            strategy: strategy.name(),
            success_pct: Vec::with_capacity(seeds.len()),
            p95_ms: Vec::with_capacity(seeds.len()),
            bad_share_pct: Vec::with_capacity(seeds.len()),
        })
        .collect();

    for &seed in seeds {
        let mut scenario = scenario.clone();
        scenario.seed = seed;
        for (aggregate, results) in aggregates.iter_mut().zip(run_all(&scenario, strategies)) {
            aggregate.success_pct.push(pct(results.success, results.total));
            aggregate.p95_ms.push(results.p95_lat_ms);
            aggregate
                .bad_share_pct
                .push(100.0 * results.bad_window_degraded_share);
        }
    }

    aggregates
}

fn pct(n: usize, d: usize) -> f64 {
    match d {
        0 => 0.0,
        d => 100.0 * n as f64 / d as f64,
    }
}

/// Returns the mean and population standard deviation of the samples.
fn mean_std(samples: &[f64]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    if samples.len() == 1 {
        return (mean, 0.0);
    }
    let variance = samples
        .iter()
        .map(|v| {
            let d = v - mean;
            d * d
        })
        .sum::<f64>()
        / samples.len() as f64;
    (mean, variance.sqrt())
}

impl Display for SeedAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (success_mean, success_std) = mean_std(&self.success_pct);
        let (p95_mean, p95_std) = mean_std(&self.p95_ms);
        let (share_mean, share_std) = mean_std(&self.bad_share_pct);
        write!(
            f,
            "{}: success={success_mean:.2}% ± {success_std:.2}, p95={p95_mean:.2}ms ± {p95_std:.2}, bad-window share={share_mean:.2}% ± {share_std:.2}",
            self.strategy
        )
    }
}
