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

//! Pheromone updates applied when the caller reports a call outcome.
//!
//! An event is bad when the call failed or, with a slow threshold
//! configured, when it succeeded slower than the threshold. Bad events add
//! negative pheromone and optionally strip a fraction of the positive;
//! good events deposit positive pheromone inversely proportional to the
//! observed latency and forgive part of the accumulated error. Slow
//! successes get the forgiveness but never a positive deposit.

use crate::router::{
    state::{EndpointState, RouterState},
    tuning::Tuning,
};

/// Guard against division blow-up at near-zero latencies.
const LATENCY_EPSILON: f64 = 1e-6;

/// Applies one reported outcome to the target endpoint.
///
/// Unknown services and unknown addresses are silent no-ops: endpoint
/// membership may have changed between pick and report, and the caller has
/// no corrective action either way.
pub(crate) fn apply_report(
    state: &mut RouterState,
    service: &str,
    endpoint: &str,
    latency_seconds: f64,
    success: bool,
) {
    // Per-request evaporation sweeps the full state before the update so
    // pheromone half-life is measured in reports, not wall-clock time.
    let req_evap_rate = state.tuning.req_evap_rate;
    if req_evap_rate > 0.0 {
        state.evaporate_all(req_evap_rate);
    }

    let tuning = state.tuning.clone();
    let is_slow = tuning.slow_threshold_sec > 0.0 && latency_seconds > tuning.slow_threshold_sec;

    let Some(target) = state.endpoint_mut(service, endpoint) else {
        tracing::trace!(service, endpoint, "dropping report for unknown endpoint");
        return;
    };

    if !success || is_slow {
        bad_event(target, &tuning, success);
    } else {
        good_event(target, &tuning, latency_seconds);
    }
}

fn bad_event(endpoint: &mut EndpointState, tuning: &Tuning, success: bool) {
    endpoint.pheromones.error.neg += tuning.neg_reinforce;
    if tuning.alpha_bad > 0.0 {
        endpoint.pheromones.latency.pos *= 1.0 - tuning.alpha_bad;
    }
    // Slow successes deposit no positive pheromone, but still earn a small
    // forgiveness so a slow-but-working endpoint cannot stick at high
    // negative pheromone forever.
    if success {
        endpoint.pheromones.error.neg *= 1.0 - tuning.evaporation_rate;
    }
}

fn good_event(endpoint: &mut EndpointState, tuning: &Tuning, latency_seconds: f64) {
    // Faster calls deposit more credit.
    endpoint.pheromones.latency.pos += tuning.pos_reinforce / (latency_seconds + LATENCY_EPSILON);
    // Success forgives part of the accumulated error pheromone.
    endpoint.pheromones.error.neg *= 1.0 - tuning.evaporation_rate;
}
