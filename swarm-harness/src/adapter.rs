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

//! Router adapter for the harness strategy surface.

use swarm_route::{PheromoneSnapshot, PickError, SwarmRouter};

use crate::strategy::Strategy;

/// [`SwarmRouter`] behind the [`Strategy`] surface, tuned for simulation
/// runs. The router's own defaults remain authoritative for library users;
/// the values below are specific to the simulated traffic shapes.
pub struct SwarmRouteAdapter {
    router: SwarmRouter,
}

impl SwarmRouteAdapter {
    /// Creates an adapter with an entropy-seeded router.
    ///
    /// Must be called within a tokio runtime.
    pub fn new() -> Self {
        Self::configure(SwarmRouter::new())
    }

    /// Creates an adapter whose selection sequence is reproducible from
    /// `seed`.
    ///
    /// Must be called within a tokio runtime.
    pub fn with_seed(seed: u64) -> Self {
        Self::configure(SwarmRouter::with_seed(seed))
    }

    fn configure(router: SwarmRouter) -> Self {
        // Decouple decay from wall-clock: half-life of roughly 2000 requests.
        router.set_request_evap_rate(0.0003466);
        // Lower exploration floor so clearly bad endpoints sink close to zero.
        router.set_base_weight(0.05);
        // Asymmetric scales: bad events must outweigh residual fast-success
        // credit on a degraded endpoint.
        router.set_pos_neg_scale(0.25, 1.2);
        // Successes slower than ~2x the healthy target count as bad, and bad
        // events strip a fifth of the accumulated positive pheromone.
        router.set_slow_threshold_sec(0.070);
        router.set_bad_pos_decay(0.20);
        // Uniform re-check of non-terrible endpoints every 500 picks.
        router.set_periodic_exploration(500, 3.0);

        SwarmRouteAdapter { router }
    }

    /// Read-only copy of the router's pheromone levels, for demo output.
    pub fn pheromone_snapshot(&self) -> PheromoneSnapshot {
        self.router.pheromone_snapshot()
    }
}

impl Default for SwarmRouteAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for SwarmRouteAdapter {
    fn name(&self) -> &'static str {
        "SwarmRoute"
    }

    fn add_service(&mut self, name: &str, endpoints: &[String]) {
        self.router.add_service(name, endpoints.iter().cloned());
    }

    fn pick_endpoint(&mut self, service: &str) -> Result<String, PickError> {
        self.router.pick_endpoint(service)
    }

    fn report_result(&mut self, service: &str, endpoint: &str, latency_seconds: f64, success: bool) {
        self.router
            .report_result(service, endpoint, latency_seconds, success);
    }
}
