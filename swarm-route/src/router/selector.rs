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

//! Weighted-random endpoint selection with periodic forced exploration.
//!
//! Each endpoint is scored `(pos + base_weight) / (1 + neg)`: the additive
//! floor keeps cold endpoints selectable, the denominator softly decays
//! attractiveness as failures accumulate, and the ratio keeps either signal
//! from dominating on its own. On every Nth pick (if configured) selection
//! instead draws uniformly among endpoints that are not clearly terrible,
//! re-admitting recovered endpoints without sending real volume to bad ones.
//!
//! Planning runs under the router's state lock; the weighted draw itself
//! operates on a snapshot taken under the lock, so sampling never races the
//! evaporator.

use rand::Rng;

use crate::{error::PickError, router::state::RouterState};

/// Decision taken under the state lock for a single pick.
#[derive(Debug)]
pub(crate) enum PickPlan {
    /// Forced exploration: draw uniformly among these addresses.
    Explore(Vec<String>),
    /// Weighted draw over the snapshotted candidates.
    Weighted(WeightSnapshot),
}

/// Per-endpoint values snapshotted under the lock for the weighted draw.
///
/// `base_weight` is captured together with the candidates so a concurrent
/// setter cannot shift the weights mid-draw.
#[derive(Debug)]
pub(crate) struct WeightSnapshot {
    pub candidates: Vec<Candidate>,
    pub base_weight: f64,
}

/// Address plus the two pheromone levels selection consumes.
#[derive(Debug)]
pub(crate) struct Candidate {
    pub address: String,
    pub pos: f64,
    pub neg: f64,
}

/// Advances the per-service pick counter and plans the pick.
///
/// The counter is incremented on every pick, weighted or exploring, even
/// though only the exploration branch reads it: skipping the increment on
/// the weighted path would shift which later picks explore and break seeded
/// reproducibility.
pub(crate) fn plan_pick(state: &mut RouterState, service: &str) -> Result<PickPlan, PickError> {
    let has_endpoints = state
        .services
        .get(service)
        .is_some_and(|s| !s.endpoints.is_empty());
    if !has_endpoints {
        return Err(PickError::no_endpoints(service));
    }

    let count = state.pick_counts.entry(service.to_string()).or_insert(0);
    *count += 1;
    let count = *count;

    let tuning = &state.tuning;
    let service = &state.services[service];

    let explore = tuning.explore_every_n > 0 && count % tuning.explore_every_n == 0;
    if explore {
        let mut candidates: Vec<String> = service
            .endpoints
            .iter()
            .filter(|ep| ep.pheromones.error.neg <= tuning.explore_neg_threshold)
            .map(|ep| ep.address.clone())
            .collect();
        if candidates.is_empty() {
            // Every endpoint is past the threshold; fall back to the full set.
            candidates = service
                .endpoints
                .iter()
                .map(|ep| ep.address.clone())
                .collect();
        }
        return Ok(PickPlan::Explore(candidates));
    }

    let candidates = service
        .endpoints
        .iter()
        .map(|ep| Candidate {
            address: ep.address.clone(),
            pos: ep.pheromones.latency.pos,
            neg: ep.pheromones.error.neg,
        })
        .collect();

    Ok(PickPlan::Weighted(WeightSnapshot {
        candidates,
        base_weight: tuning.base_weight,
    }))
}

/// Draws one endpoint from the snapshot via its cumulative weight.
///
/// Candidates must be non-empty; [`plan_pick`] guarantees it.
pub(crate) fn sample_weighted<R: Rng>(snapshot: &WeightSnapshot, rng: &mut R) -> String {
    let last = snapshot
        .candidates
        .last()
        .expect("weighted pick planned for empty candidate list");

    let weights: Vec<f64> = snapshot
        .candidates
        .iter()
        .map(|c| (c.pos + snapshot.base_weight) / (1.0 + c.neg))
        .collect();
    let total: f64 = weights.iter().sum();

    if total <= 0.0 {
        // Zero base weight and all-cold endpoints. Deterministic fallback:
        // the last endpoint in insertion order.
        return last.address.clone();
    }

    let draw = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for (candidate, weight) in snapshot.candidates.iter().zip(&weights) {
        cumulative += weight;
        if draw <= cumulative {
            return candidate.address.clone();
        }
    }

    // Rounding left the cumulative sum short of the draw.
    last.address.clone()
}
