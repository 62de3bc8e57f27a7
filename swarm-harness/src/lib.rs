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

//! Simulation harness comparing SwarmRoute against baseline balancers.
//!
//! The harness drives every balancer through the same [`Strategy`] surface:
//! a deterministic world simulator ([`sim`]) replays a scenario of endpoint
//! latencies, error rates and mid-run environment changes, and reports
//! success rates, latency percentiles and selection shares per strategy.
//! [`aggregate`] repeats a scenario across seeds and reports mean and
//! spread per metric.

pub mod adapter;
pub mod aggregate;
pub mod baselines;
pub mod scenarios;
pub mod sim;
pub mod strategy;

pub use adapter::SwarmRouteAdapter;
pub use strategy::Strategy;

use crate::baselines::{LeastLatency, PowerOfTwoChoices, Random, RoundRobin};

/// The default strategy lineup: the four baselines plus the router adapter.
///
/// Must be called within a tokio runtime (the adapter spawns the router's
/// background task).
pub fn default_strategies() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(Random::new(1)),
        Box::new(RoundRobin::new()),
        Box::new(PowerOfTwoChoices::new(2, 0.2)),
        Box::new(LeastLatency::new(3, 0.2)),
        Box::new(SwarmRouteAdapter::new()),
    ]
}
