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

//! Tunable adaptation parameters.
//!
//! All values are adjusted through setters on the router which clamp their
//! arguments into the valid domain silently. Out-of-domain inputs carry no
//! signal the caller could act on, so there is nothing to report.

/// Adaptation parameters shared by the selector, reinforcer and evaporator.
#[derive(Debug, Clone)]
pub(crate) struct Tuning {
    /// Wall-clock decay applied per background tick, in `[0, 1]`.
    pub evaporation_rate: f64,
    /// Per-request decay applied before every report, in `[0, 1]`.
    ///
    /// A value of `ln(2) / h` yields a pheromone half-life of `h` requests,
    /// independent of wall-clock time. Disabled at 0.
    pub req_evap_rate: f64,
    /// Additive selection floor so cold endpoints keep non-zero probability.
    pub base_weight: f64,
    /// Scale of positive pheromone deposited on good events.
    pub pos_reinforce: f64,
    /// Negative pheromone deposited per bad event.
    pub neg_reinforce: f64,
    /// Forced uniform exploration on every Nth pick per service; 0 disables.
    pub explore_every_n: u64,
    /// Negative pheromone above which an endpoint is considered terrible
    /// and excluded from forced exploration.
    pub explore_neg_threshold: f64,
    /// Successful calls slower than this many seconds count as bad events;
    /// 0 disables the gate.
    pub slow_threshold_sec: f64,
    /// Fraction of positive pheromone removed on bad events, in `[0, 1]`.
    pub alpha_bad: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            evaporation_rate: 0.05,
            req_evap_rate: 0.0,
            base_weight: 0.10,
            pos_reinforce: 1.0,
            neg_reinforce: 1.0,
            explore_every_n: 0,
            explore_neg_threshold: 3.0,
            slow_threshold_sec: 0.0,
            alpha_bad: 0.0,
        }
    }
}

/// Clamps a rate into `[0, 1]`. NaN maps to 0.
pub(crate) fn clamp_rate(value: f64) -> f64 {
    match value.is_nan() {
        true => 0.0,
        false => value.clamp(0.0, 1.0),
    }
}

/// Clamps a magnitude into `[0, +inf)`. NaN maps to 0.
pub(crate) fn clamp_magnitude(value: f64) -> f64 {
    match value.is_nan() {
        true => 0.0,
        false => value.max(0.0),
    }
}
