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

//! The pheromone router.
//!
//! [`SwarmRouter`] is the public entry point. Callers register services,
//! pick endpoints, and report observed outcomes; a background task decays
//! the accumulated pheromones once per second.
//!
//! ## Locking
//!
//! A single readers-writer lock protects all services, endpoints,
//! pheromones and tuning parameters. Registration, reports, evaporation and
//! the setters take it exclusively; snapshots take it shared. A pick takes
//! it exclusively to advance the per-service pick counter, then releases it
//! before sampling: the weighted draw runs on per-endpoint values (and the
//! base weight) snapshotted under the lock, so it cannot race the
//! evaporator or tear against a concurrent report.
//!
//! The PRNG lives behind its own mutex, outside the state lock, and is
//! locked only after the state lock has been released.

use std::{
    sync::{Arc, Mutex, RwLock},
    time::Duration,
};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    error::PickError,
    router::{
        evaporator::EvaporatorTask,
        selector::PickPlan,
        state::RouterState,
        tuning::{clamp_magnitude, clamp_rate},
    },
};

pub mod evaporator;
pub mod reinforcer;
pub mod selector;
pub mod state;
pub mod tuning;

pub use state::{Channel, ChannelPheromones, Pheromone, PheromoneSnapshot};

/// Interval between background evaporation ticks.
const EVAPORATION_TICK: Duration = Duration::from_secs(1);

/// Adaptive client-side load balancer.
///
/// Safe to share across threads behind a reference. Dropping the router
/// cancels its background evaporation task; [`SwarmRouter::shutdown`]
/// additionally joins the task for deterministic teardown.
pub struct SwarmRouter {
    shared: Arc<RouterShared>,
    evaporator: EvaporatorTask,
}

/// State shared between the router handle and the background task.
pub(crate) struct RouterShared {
    /// All services, endpoints, pheromones and tuning parameters.
    pub(crate) state: RwLock<RouterState>,
    /// Router-owned PRNG for the weighted sample and the exploration draw.
    ///
    /// Locked strictly after `state` so the weighted draw can run without
    /// holding the state lock. Seeded per router so concurrent routers are
    /// independent and tests never race on a global generator.
    pub(crate) rng: Mutex<ChaCha8Rng>,
}

impl SwarmRouter {
    /// Creates a router with default tuning and an entropy-seeded PRNG, and
    /// spawns the background evaporation task.
    ///
    /// Must be called within a tokio runtime.
    pub fn new() -> Self {
        Self::from_rng(ChaCha8Rng::from_os_rng())
    }

    /// Creates a router whose selection sequence is reproducible from `seed`.
    ///
    /// Must be called within a tokio runtime.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    fn from_rng(rng: ChaCha8Rng) -> Self {
        let shared = Arc::new(RouterShared {
            state: RwLock::new(RouterState::new()),
            rng: Mutex::new(rng),
        });
        let evaporator = EvaporatorTask::spawn(Arc::downgrade(&shared), EVAPORATION_TICK);

        SwarmRouter { shared, evaporator }
    }

    /// Registers `name` with the given endpoint addresses.
    ///
    /// Endpoints are created in the supplied order with all pheromones at
    /// zero. Re-registering replaces the endpoint list entirely and
    /// discards the service's prior pheromone state.
    pub fn add_service<I, S>(&self, name: &str, endpoints: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let addresses: Vec<String> = endpoints.into_iter().map(Into::into).collect();
        tracing::debug!(service = name, endpoints = addresses.len(), "registering service");
        self.shared
            .state
            .write()
            .unwrap()
            .register_service(name, addresses);
    }

    /// Selects an endpoint for `service` by weighted-random draw over the
    /// current pheromone levels, or uniformly among non-terrible endpoints
    /// on a forced exploration pick.
    ///
    /// Fails only when the service is unknown or has zero endpoints.
    pub fn pick_endpoint(&self, service: &str) -> Result<String, PickError> {
        let plan = {
            let mut state = self.shared.state.write().unwrap();
            selector::plan_pick(&mut state, service)?
        };

        let mut rng = self.shared.rng.lock().unwrap();
        match plan {
            PickPlan::Explore(mut candidates) => {
                let index = rng.random_range(0..candidates.len());
                Ok(candidates.swap_remove(index))
            }
            PickPlan::Weighted(snapshot) => Ok(selector::sample_weighted(&snapshot, &mut *rng)),
        }
    }

    /// Reports the outcome of a call dispatched to `endpoint`.
    ///
    /// Updates the endpoint's pheromones per the observed latency and
    /// success flag. Unknown services and addresses are silent no-ops.
    pub fn report_result(&self, service: &str, endpoint: &str, latency_seconds: f64, success: bool) {
        let mut state = self.shared.state.write().unwrap();
        reinforcer::apply_report(&mut state, service, endpoint, latency_seconds, success);
    }

    /// Returns a deep copy of the current pheromone levels for monitoring:
    /// service name to endpoint address to `(latency.pos, error.neg)`.
    pub fn pheromone_snapshot(&self) -> PheromoneSnapshot {
        self.shared.state.read().unwrap().snapshot()
    }

    /// Applies one evaporation step to every pheromone.
    ///
    /// The background task calls this once per second; it is public so
    /// tests can drive decay deterministically.
    pub fn evaporate_once(&self) {
        evaporator::evaporate_once(&self.shared);
    }

    /// Stops the background evaporation task and waits for it to exit.
    pub async fn shutdown(self) {
        self.evaporator.shutdown().await;
        tracing::debug!("router shut down");
    }
}

/// Tuning setters. Arguments are clamped into their valid domain silently.
impl SwarmRouter {
    /// Sets the wall-clock decay applied per background tick. Clamped to
    /// `[0, 1]`.
    pub fn set_evaporation_rate(&self, rate: f64) {
        self.shared.state.write().unwrap().tuning.evaporation_rate = clamp_rate(rate);
    }

    /// Sets the per-request decay applied before every report. Clamped to
    /// `[0, 1]`.
    ///
    /// A value of `ln(2) / h` gives a pheromone half-life of `h` requests.
    pub fn set_request_evap_rate(&self, rate: f64) {
        self.shared.state.write().unwrap().tuning.req_evap_rate = clamp_rate(rate);
    }

    /// Sets the additive base weight that keeps cold endpoints selectable.
    /// Clamped to `[0, +inf)`.
    pub fn set_base_weight(&self, weight: f64) {
        self.shared.state.write().unwrap().tuning.base_weight = clamp_magnitude(weight);
    }

    /// Sets the positive and negative reinforcement scales. Both clamped to
    /// `[0, +inf)`.
    pub fn set_pos_neg_scale(&self, k_pos: f64, k_neg: f64) {
        let mut state = self.shared.state.write().unwrap();
        state.tuning.pos_reinforce = clamp_magnitude(k_pos);
        state.tuning.neg_reinforce = clamp_magnitude(k_neg);
    }

    /// Enables forced uniform exploration on every `every_n`th pick per
    /// service; 0 disables it. `neg_threshold` (clamped to `[0, +inf)`)
    /// marks endpoints too degraded to explore.
    pub fn set_periodic_exploration(&self, every_n: u64, neg_threshold: f64) {
        let mut state = self.shared.state.write().unwrap();
        state.tuning.explore_every_n = every_n;
        state.tuning.explore_neg_threshold = clamp_magnitude(neg_threshold);
    }

    /// Sets the latency above which a successful call still counts as a bad
    /// event. Clamped to `[0, +inf)`; 0 disables the gate.
    pub fn set_slow_threshold_sec(&self, threshold: f64) {
        self.shared.state.write().unwrap().tuning.slow_threshold_sec = clamp_magnitude(threshold);
    }

    /// Sets the fraction of positive pheromone stripped on bad events.
    /// Clamped to `[0, 1]`; 0 disables the decay.
    pub fn set_bad_pos_decay(&self, alpha: f64) {
        self.shared.state.write().unwrap().tuning.alpha_bad = clamp_rate(alpha);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn levels(router: &SwarmRouter, service: &str, addr: &str) -> Pheromone {
        router.pheromone_snapshot()[service][addr]
    }

    fn set_levels(router: &SwarmRouter, service: &str, addr: &str, pos: f64, neg: f64) {
        let mut state = router.shared.state.write().unwrap();
        let ep = state.endpoint_mut(service, addr).unwrap();
        ep.pheromones.latency.pos = pos;
        ep.pheromones.error.neg = neg;
    }

    #[test_log::test(tokio::test)]
    async fn pick_fails_for_unknown_and_empty_services() {
        let router = SwarmRouter::with_seed(42);

        assert_eq!(
            router.pick_endpoint("missing"),
            Err(PickError::no_endpoints("missing"))
        );

        router.add_service("empty", Vec::<String>::new());
        assert_eq!(
            router.pick_endpoint("empty"),
            Err(PickError::no_endpoints("empty"))
        );
    }

    #[test_log::test(tokio::test)]
    async fn single_tick_evaporation_is_exact() {
        let router = SwarmRouter::with_seed(101);
        router.set_evaporation_rate(0.2);
        router.add_service("svc", ["a"]);
        set_levels(&router, "svc", "a", 1.0, 0.5);

        router.evaporate_once();

        let after = levels(&router, "svc", "a");
        assert!((after.pos - 0.8).abs() < 1e-12);
        assert!((after.neg - 0.4).abs() < 1e-12);
    }

    #[test_log::test(tokio::test)]
    async fn dominant_endpoint_leaves_room_for_cold_ones() {
        let router = SwarmRouter::with_seed(2024);
        router.set_evaporation_rate(0.0);
        router.add_service("svc", ["a", "b", "c"]);
        set_levels(&router, "svc", "a", 100.0, 0.0);

        let total = 20_000;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..total {
            let addr = router.pick_endpoint("svc").unwrap();
            *counts.entry(addr).or_insert(0) += 1;
        }

        assert!(
            counts["a"] >= total * 8 / 10,
            "expected a to dominate, got {}/{total}",
            counts["a"]
        );
        assert!(counts.get("b").is_some_and(|&c| c > 0), "b never explored");
        assert!(counts.get("c").is_some_and(|&c| c > 0), "c never explored");
    }

    #[test_log::test(tokio::test)]
    async fn pick_counter_survives_reregistration() {
        let router = SwarmRouter::with_seed(5);
        // Every second pick explores; the counter must keep running across
        // a re-registration for the cadence to hold.
        router.set_periodic_exploration(2, 3.0);
        router.add_service("svc", ["a"]);

        router.pick_endpoint("svc").unwrap(); // count 1, weighted
        router.add_service("svc", ["a", "b"]);

        let state_count = {
            router.pick_endpoint("svc").unwrap(); // count 2, explores
            router.shared.state.read().unwrap().pick_counts["svc"]
        };
        assert_eq!(state_count, 2);
    }

    #[test_log::test(tokio::test)]
    async fn seeded_routers_pick_identical_sequences() {
        let left = SwarmRouter::with_seed(7);
        let right = SwarmRouter::with_seed(7);
        for router in [&left, &right] {
            router.add_service("svc", ["a", "b", "c"]);
            router.report_result("svc", "a", 0.01, true);
            router.report_result("svc", "b", 0.05, true);
        }

        let picks = |router: &SwarmRouter| -> Vec<String> {
            (0..50).map(|_| router.pick_endpoint("svc").unwrap()).collect()
        };
        assert_eq!(picks(&left), picks(&right));
    }

    #[test_log::test(tokio::test)]
    async fn setters_clamp_out_of_domain_values() {
        let router = SwarmRouter::with_seed(1);
        router.add_service("svc", ["a"]);
        set_levels(&router, "svc", "a", 1.0, 1.0);

        // A rate above 1 clamps to 1: one tick zeroes everything, never
        // driving a pheromone negative.
        router.set_evaporation_rate(2.0);
        router.evaporate_once();
        let after = levels(&router, "svc", "a");
        assert_eq!(after.pos, 0.0);
        assert_eq!(after.neg, 0.0);

        // A negative scale clamps to zero: failures stop accumulating.
        router.set_pos_neg_scale(1.0, -5.0);
        router.report_result("svc", "a", 0.0, false);
        assert_eq!(levels(&router, "svc", "a").neg, 0.0);
    }

    #[test_log::test(tokio::test)]
    async fn shutdown_joins_the_background_task() {
        let router = SwarmRouter::with_seed(3);
        router.add_service("svc", ["a"]);
        router.shutdown().await;
    }
}
