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

//! Deterministic world simulator.
//!
//! A [`Scenario`] describes a service's endpoints (mean latency, jitter,
//! error rate) and the environment changes that hit them mid-run. The
//! simulator replays the scenario against one strategy at a time: pick,
//! sample an outcome from the environment, report it back, record.
//! Everything is driven by a single seeded PRNG, so runs are reproducible.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::{self, Display},
};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::strategy::Strategy;

/// Initial environment of one endpoint.
#[derive(Debug, Clone)]
pub struct EndpointSpec {
    /// Opaque endpoint address.
    pub addr: String,
    /// Mean latency in seconds.
    pub mean_latency_sec: f64,
    /// Stddev of latency noise in seconds; 0 selects a default of 30% of
    /// the mean.
    pub jitter_sec: f64,
    /// Probability of failure per request, `0.0..=1.0`.
    pub error_rate: f64,
}

impl EndpointSpec {
    /// Convenience constructor for scenario definitions.
    pub fn new(addr: &str, mean_latency_sec: f64, jitter_sec: f64, error_rate: f64) -> Self {
        EndpointSpec {
            addr: addr.to_string(),
            mean_latency_sec,
            jitter_sec,
            error_rate,
        }
    }
}

/// Changes an endpoint's environment at a specific request index.
///
/// Fields left `None` keep their current value.
#[derive(Debug, Clone)]
pub struct EnvironmentEvent {
    /// Request index the change takes effect at.
    pub step: usize,
    /// Address of the affected endpoint.
    pub endpoint: String,
    /// New mean latency in seconds.
    pub new_mean_latency: Option<f64>,
    /// New latency noise stddev in seconds.
    pub new_jitter_sec: Option<f64>,
    /// New failure probability, clamped into `0.0..=1.0`.
    pub new_error_rate: Option<f64>,
}

/// Full simulation definition.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Service name used for registration and picks.
    pub service: String,
    /// Endpoints in registration order.
    pub endpoints: Vec<EndpointSpec>,
    /// Environment changes over the run.
    pub events: Vec<EnvironmentEvent>,
    /// Number of simulated requests.
    pub total_requests: usize,
    /// PRNG seed for outcome sampling.
    pub seed: u64,
}

/// Step at which the degrade observation window opens. Scenarios that want
/// the bad-window metric schedule their degrade event here.
pub const BAD_WINDOW_START: usize = 2000;
/// Step at which the degrade observation window closes (exclusive).
pub const BAD_WINDOW_END: usize = 6000;

/// Metrics for one phase window of the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseMetrics {
    /// Requests attempted in the window.
    pub total: usize,
    /// Successful requests in the window.
    pub success: usize,
    /// Mean latency of successes, in milliseconds.
    pub mean_lat_ms: f64,
    /// 95th percentile latency of successes, in milliseconds.
    pub p95_lat_ms: f64,
}

/// Aggregated results of one scenario run for one strategy.
#[derive(Debug, Clone)]
pub struct Results {
    /// Strategy display name.
    pub strategy: &'static str,
    /// Requests attempted.
    pub total: usize,
    /// Successful requests.
    pub success: usize,
    /// Failed requests.
    pub failure: usize,
    /// Mean latency of successes, in milliseconds.
    pub mean_lat_ms: f64,
    /// 95th percentile latency of successes, in milliseconds.
    pub p95_lat_ms: f64,
    /// Selections per endpoint, ordered for deterministic output.
    pub selection: BTreeMap<String, usize>,
    /// Windows `[0, 2000)`, `[2000, 6000)` and `[6000, ..)`.
    pub phases: [PhaseMetrics; 3],
    /// Endpoint degraded by the events applied at [`BAD_WINDOW_START`].
    pub degraded_endpoint: Option<String>,
    /// Share of bad-window selections routed to the degraded endpoint.
    pub bad_window_degraded_share: f64,
}

/// Runs the scenario for a single strategy and aggregates the results.
pub fn run_scenario(scenario: &Scenario, strategy: &mut dyn Strategy) -> Results {
    let mut env: HashMap<String, EndpointSpec> = scenario
        .endpoints
        .iter()
        .map(|spec| (spec.addr.clone(), spec.clone()))
        .collect();
    let addresses: Vec<String> = scenario
        .endpoints
        .iter()
        .map(|spec| spec.addr.clone())
        .collect();
    strategy.add_service(&scenario.service, &addresses);

    let mut events_by_step: HashMap<usize, Vec<&EnvironmentEvent>> = HashMap::new();
    for event in &scenario.events {
        events_by_step.entry(event.step).or_default().push(event);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(scenario.seed);

    let mut selection: BTreeMap<String, usize> = BTreeMap::new();
    let mut latencies: Vec<f64> = Vec::with_capacity(scenario.total_requests);
    let mut success = 0usize;

    let mut phase_latencies: [Vec<f64>; 3] = std::array::from_fn(|_| Vec::new());
    let mut phase_selection: [BTreeMap<String, usize>; 3] = std::array::from_fn(|_| BTreeMap::new());
    let mut phase_total = [0usize; 3];
    let mut phase_success = [0usize; 3];

    let mut degraded_endpoint: Option<String> = None;

    for step in 0..scenario.total_requests {
        if let Some(events) = events_by_step.get(&step) {
            // The degraded endpoint is inferred from the values before the
            // window-opening events overwrite them.
            if step == BAD_WINDOW_START {
                degraded_endpoint = detect_degraded(&env, events);
            }
            for event in events {
                let Some(spec) = env.get_mut(&event.endpoint) else {
                    continue;
                };
                if let Some(mean) = event.new_mean_latency {
                    spec.mean_latency_sec = mean;
                }
                if let Some(jitter) = event.new_jitter_sec {
                    spec.jitter_sec = jitter;
                }
                if let Some(rate) = event.new_error_rate {
                    spec.error_rate = rate.clamp(0.0, 1.0);
                }
            }
        }

        let Ok(addr) = strategy.pick_endpoint(&scenario.service) else {
            continue;
        };
        *selection.entry(addr.clone()).or_insert(0) += 1;
        let Some(spec) = env.get(&addr) else {
            continue;
        };

        let phase = match step {
            s if s >= BAD_WINDOW_END => 2,
            s if s >= BAD_WINDOW_START => 1,
            _ => 0,
        };
        *phase_selection[phase].entry(addr.clone()).or_insert(0) += 1;
        phase_total[phase] += 1;

        let failed = rng.random::<f64>() < spec.error_rate;
        let latency = sample_latency(spec, &mut rng);
        // Failures report a fixed overhead so latency-aware strategies can
        // learn from them too.
        let reported = if failed { latency + 0.250 } else { latency };
        strategy.report_result(&scenario.service, &addr, reported, !failed);

        if !failed {
            success += 1;
            latencies.push(latency);
            phase_success[phase] += 1;
            phase_latencies[phase].push(latency);
        }
    }

    let (mean, p95) = summarize_latency(&latencies);
    let phases = std::array::from_fn(|i| {
        let (mean, p95) = summarize_latency(&phase_latencies[i]);
        PhaseMetrics {
            total: phase_total[i],
            success: phase_success[i],
            mean_lat_ms: mean * 1000.0,
            p95_lat_ms: p95 * 1000.0,
        }
    });

    let bad_window_degraded_share = degraded_endpoint
        .as_ref()
        .map(|degraded| {
            let window_total: usize = phase_selection[1].values().sum();
            match window_total {
                0 => 0.0,
                total => {
                    *phase_selection[1].get(degraded).unwrap_or(&0) as f64 / total as f64
                }
            }
        })
        .unwrap_or(0.0);

    Results {
        strategy: strategy.name(),
        total: scenario.total_requests,
        success,
        failure: scenario.total_requests - success,
        mean_lat_ms: mean * 1000.0,
        p95_lat_ms: p95 * 1000.0,
        selection,
        phases,
        degraded_endpoint,
        bad_window_degraded_share,
    }
}

/// Runs the scenario for every strategy, in order.
pub fn run_all(scenario: &Scenario, strategies: &mut [Box<dyn Strategy>]) -> Vec<Results> {
    strategies
        .iter_mut()
        .map(|strategy| run_scenario(scenario, strategy.as_mut()))
        .collect()
}

/// Samples a latency around the endpoint's mean with per-endpoint jitter,
/// truncated to `[0.2x, 5x]` of the mean.
fn sample_latency(spec: &EndpointSpec, rng: &mut ChaCha8Rng) -> f64 {
    let mut jitter = spec.jitter_sec;
    if jitter <= 0.0 {
        // Default to a 30% coefficient of variation.
        jitter = 0.3 * spec.mean_latency_sec;
    }

    let noise: f64 = rng.sample(StandardNormal);
    let latency = spec.mean_latency_sec + noise * jitter;

    let (min_lat, max_lat) = if spec.mean_latency_sec == 0.0 {
        (0.001, 0.050)
    } else {
        (0.2 * spec.mean_latency_sec, 5.0 * spec.mean_latency_sec)
    };
    latency.clamp(min_lat, max_lat)
}

/// Picks the endpoint whose events at this step worsen it the most, scored
/// by relative latency increase plus error-rate increase.
fn detect_degraded(
    env: &HashMap<String, EndpointSpec>,
    events: &[&EnvironmentEvent],
) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;
    for event in events {
        let Some(spec) = env.get(&event.endpoint) else {
            continue;
        };

        let mut score = 0.0;
        if let Some(new_mean) = event.new_mean_latency {
            if spec.mean_latency_sec > 0.0 {
                score += new_mean / spec.mean_latency_sec - 1.0;
            } else if new_mean > 0.0 {
                score += 1.0;
            }
        }
        if let Some(new_rate) = event.new_error_rate {
            score += new_rate - spec.error_rate;
        }

        if score > 0.0 && best.is_none_or(|(seen, _)| score > seen) {
            best = Some((score, event.endpoint.as_str()));
        }
    }
    best.map(|(_, addr)| addr.to_string())
}

/// Returns `(mean, p95)` of the samples, in the samples' unit.
pub fn summarize_latency(samples: &[f64]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let index = ((0.95 * sorted.len() as f64).ceil() as usize)
        .saturating_sub(1)
        .min(sorted.len() - 1);
    (mean, sorted[index])
}

fn pct(n: usize, d: usize) -> f64 {
    match d {
        0 => 0.0,
        d => 100.0 * n as f64 / d as f64,
    }
}

impl Display for Results {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: success={}/{} ({:.1}%), mean={:.1}ms p95={:.1}ms",
            self.strategy,
            self.success,
            self.total,
            pct(self.success, self.total),
            self.mean_lat_ms,
            self.p95_lat_ms
        )?;
        for (addr, count) in &self.selection {
            writeln!(f, "  {addr}: {count}")?;
        }
        let windows = ["0-1999", "2000-5999", "6000-..."];
        for (window, metrics) in windows.iter().zip(&self.phases) {
            writeln!(
                f,
                "  phase[{window}]: success={}/{} ({:.1}%), mean={:.1}ms p95={:.1}ms",
                metrics.success,
                metrics.total,
                pct(metrics.success, metrics.total),
                metrics.mean_lat_ms,
                metrics.p95_lat_ms
            )?;
        }
        if let Some(degraded) = &self.degraded_endpoint {
            if self.phases[1].total > 0 {
                writeln!(
                    f,
                    "  bad-window share to degraded ({degraded}): {:.1}%",
                    100.0 * self.bad_window_degraded_share
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SwarmRouteAdapter;

    // The router must rapidly avoid a 100% failing endpoint and keep its
    // selection share near zero aside from periodic exploration.
    #[test_log::test(tokio::test)]
    async fn always_bad_endpoint_is_avoided() {
        let scenario = Scenario {
            service: "svc".to_string(),
            endpoints: vec![
                EndpointSpec::new("good", 0.030, 0.009, 0.0),
                EndpointSpec::new("bad", 0.030, 0.009, 1.0),
            ],
            events: vec![],
            total_requests: 3000,
            seed: 42,
        };

        let mut adapter = SwarmRouteAdapter::with_seed(42);
        let results = run_scenario(&scenario, &mut adapter);

        let bad_share =
            *results.selection.get("bad").unwrap_or(&0) as f64 / results.total as f64;
        assert!(
            bad_share <= 0.03,
            "bad endpoint share too high: {:.2}%",
            100.0 * bad_share
        );
    }

    // Slow-but-successful endpoints count as bad under the adapter's slow
    // threshold and receive only a small fraction of traffic.
    #[test_log::test(tokio::test)]
    async fn always_slow_endpoint_is_mostly_avoided() {
        let scenario = Scenario {
            service: "svc".to_string(),
            endpoints: vec![
                EndpointSpec::new("fast", 0.030, 0.009, 0.0),
                EndpointSpec::new("slow", 0.120, 0.036, 0.0),
            ],
            events: vec![],
            total_requests: 3000,
            seed: 424242,
        };

        let mut adapter = SwarmRouteAdapter::with_seed(424242);
        let results = run_scenario(&scenario, &mut adapter);

        let slow_share =
            *results.selection.get("slow").unwrap_or(&0) as f64 / results.total as f64;
        assert!(
            slow_share <= 0.15,
            "slow endpoint share too high: {:.2}%",
            100.0 * slow_share
        );
    }

    #[test_log::test(tokio::test)]
    async fn degrade_events_are_detected_and_applied() {
        let scenario = Scenario {
            service: "svc".to_string(),
            endpoints: vec![
                EndpointSpec::new("a", 0.030, 0.009, 0.01),
                EndpointSpec::new("b", 0.035, 0.010, 0.01),
            ],
            events: vec![
                EnvironmentEvent {
                    step: BAD_WINDOW_START,
                    endpoint: "b".to_string(),
                    new_mean_latency: Some(0.120),
                    new_jitter_sec: None,
                    new_error_rate: Some(0.20),
                },
                EnvironmentEvent {
                    step: BAD_WINDOW_END,
                    endpoint: "b".to_string(),
                    new_mean_latency: Some(0.035),
                    new_jitter_sec: None,
                    new_error_rate: Some(0.01),
                },
            ],
            total_requests: 8000,
            seed: 7,
        };

        let mut adapter = SwarmRouteAdapter::with_seed(7);
        let results = run_scenario(&scenario, &mut adapter);

        assert_eq!(results.degraded_endpoint.as_deref(), Some("b"));
        assert!(
            results.bad_window_degraded_share < 0.5,
            "router kept sending to the degraded endpoint: {:.2}%",
            100.0 * results.bad_window_degraded_share
        );
        assert_eq!(
            results.phases.iter().map(|p| p.total).sum::<usize>(),
            results.total
        );
    }

    #[test]
    fn latency_summary_reports_mean_and_p95() {
        let samples: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        let (mean, p95) = summarize_latency(&samples);
        assert!((mean - 50.5).abs() < 1e-9);
        assert_eq!(p95, 95.0);

        assert_eq!(summarize_latency(&[]), (0.0, 0.0));
    }

    #[test]
    fn latency_sampling_respects_truncation() {
        let spec = EndpointSpec::new("a", 0.030, 0.100, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..1000 {
            let latency = sample_latency(&spec, &mut rng);
            assert!(latency >= 0.2 * 0.030 - 1e-12);
            assert!(latency <= 5.0 * 0.030 + 1e-12);
        }
    }
}
