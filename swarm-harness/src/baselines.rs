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

//! Baseline balancing strategies the router is compared against.
//!
//! All baselines carry their own seeded PRNG where they need randomness, so
//! simulator runs stay reproducible.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use swarm_route::PickError;

use crate::strategy::Strategy;

/// Per-service exponentially weighted moving averages of observed latency.
///
/// Shared by the EWMA-based baselines. A value of zero means unseen.
struct EwmaTable {
    alpha: f64,
    values: HashMap<String, HashMap<String, f64>>,
}

impl EwmaTable {
    fn new(alpha: f64) -> Self {
        // Out-of-domain smoothing factors fall back to a sane default.
        let alpha = if alpha <= 0.0 || alpha >= 1.0 { 0.2 } else { alpha };
        EwmaTable {
            alpha,
            values: HashMap::new(),
        }
    }

    fn get(&self, service: &str, endpoint: &str) -> f64 {
        self.values
            .get(service)
            .and_then(|eps| eps.get(endpoint))
            .copied()
            .unwrap_or(0.0)
    }

    fn observe(&mut self, service: &str, endpoint: &str, latency_seconds: f64) {
        let current = self
            .values
            .entry(service.to_string())
            .or_default()
            .entry(endpoint.to_string())
            .or_insert(0.0);
        *current = if *current == 0.0 {
            latency_seconds
        } else {
            self.alpha * latency_seconds + (1.0 - self.alpha) * *current
        };
    }
}

fn registered<'a>(
    services: &'a HashMap<String, Vec<String>>,
    service: &str,
) -> Result<&'a [String], PickError> {
    services
        .get(service)
        .filter(|endpoints| !endpoints.is_empty())
        .map(Vec::as_slice)
        .ok_or_else(|| PickError::no_endpoints(service))
}

/// Selects uniformly at random among endpoints.
pub struct Random {
    rng: ChaCha8Rng,
    services: HashMap<String, Vec<String>>,
}

impl Random {
    pub fn new(seed: u64) -> Self {
        Random {
            rng: ChaCha8Rng::seed_from_u64(seed),
            services: HashMap::new(),
        }
    }
}

impl Strategy for Random {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn add_service(&mut self, name: &str, endpoints: &[String]) {
        self.services.insert(name.to_string(), endpoints.to_vec());
    }

    fn pick_endpoint(&mut self, service: &str) -> Result<String, PickError> {
        let endpoints = registered(&self.services, service)?;
        Ok(endpoints[self.rng.random_range(0..endpoints.len())].clone())
    }

    fn report_result(&mut self, _: &str, _: &str, _: f64, _: bool) {}
}

/// Cycles endpoints in registration order per service.
pub struct RoundRobin {
    services: HashMap<String, Vec<String>>,
    next: HashMap<String, usize>,
}

impl RoundRobin {
    pub fn new() -> Self {
        RoundRobin {
            services: HashMap::new(),
            next: HashMap::new(),
        }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for RoundRobin {
    fn name(&self) -> &'static str {
        "RoundRobin"
    }

    fn add_service(&mut self, name: &str, endpoints: &[String]) {
        self.services.insert(name.to_string(), endpoints.to_vec());
    }

    fn pick_endpoint(&mut self, service: &str) -> Result<String, PickError> {
        let endpoints = registered(&self.services, service)?;
        let address = {
            let index = self.next.entry(service.to_string()).or_insert(0);
            let address = endpoints[*index % endpoints.len()].clone();
            *index = (*index + 1) % endpoints.len();
            address
        };
        Ok(address)
    }

    fn report_result(&mut self, _: &str, _: &str, _: f64, _: bool) {}
}

/// Samples two distinct endpoints and picks the one with the lower observed
/// EWMA latency. Unseen endpoints win over seen ones; two unseen endpoints
/// are broken by a coin flip.
pub struct PowerOfTwoChoices {
    rng: ChaCha8Rng,
    services: HashMap<String, Vec<String>>,
    ewma: EwmaTable,
}

impl PowerOfTwoChoices {
    pub fn new(seed: u64, alpha: f64) -> Self {
        PowerOfTwoChoices {
            rng: ChaCha8Rng::seed_from_u64(seed),
            services: HashMap::new(),
            ewma: EwmaTable::new(alpha),
        }
    }
}

impl Strategy for PowerOfTwoChoices {
    fn name(&self) -> &'static str {
        "PowerOfTwoChoices"
    }

    fn add_service(&mut self, name: &str, endpoints: &[String]) {
        self.services.insert(name.to_string(), endpoints.to_vec());
    }

    fn pick_endpoint(&mut self, service: &str) -> Result<String, PickError> {
        let endpoints = registered(&self.services, service)?;
        if endpoints.len() == 1 {
            return Ok(endpoints[0].clone());
        }

        // Two distinct indices.
        let first = self.rng.random_range(0..endpoints.len());
        let mut second = self.rng.random_range(0..endpoints.len() - 1);
        if second >= first {
            second += 1;
        }
        let (a, b) = (&endpoints[first], &endpoints[second]);

        let seen_a = self.ewma.get(service, a);
        let seen_b = self.ewma.get(service, b);
        let pick = if seen_a == 0.0 && seen_b == 0.0 {
            if self.rng.random_range(0..2) == 0 { a } else { b }
        } else if seen_a == 0.0 {
            a
        } else if seen_b == 0.0 {
            b
        } else if seen_a <= seen_b {
            a
        } else {
            b
        };
        Ok(pick.clone())
    }

    fn report_result(&mut self, service: &str, endpoint: &str, latency_seconds: f64, _: bool) {
        self.ewma.observe(service, endpoint, latency_seconds);
    }
}

/// Always picks the endpoint with the smallest observed EWMA latency,
/// falling back to a random choice before any observation exists.
pub struct LeastLatency {
    rng: ChaCha8Rng,
    services: HashMap<String, Vec<String>>,
    ewma: EwmaTable,
}

impl LeastLatency {
    pub fn new(seed: u64, alpha: f64) -> Self {
        LeastLatency {
            rng: ChaCha8Rng::seed_from_u64(seed),
            services: HashMap::new(),
            ewma: EwmaTable::new(alpha),
        }
    }
}

impl Strategy for LeastLatency {
    fn name(&self) -> &'static str {
        "LeastLatency"
    }

    fn add_service(&mut self, name: &str, endpoints: &[String]) {
        self.services.insert(name.to_string(), endpoints.to_vec());
    }

    fn pick_endpoint(&mut self, service: &str) -> Result<String, PickError> {
        let endpoints = registered(&self.services, service)?;

        let best = endpoints
            .iter()
            .filter_map(|ep| {
                let seen = self.ewma.get(service, ep);
                (seen > 0.0).then_some((ep, seen))
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(ep, _)| ep.clone());

        match best {
            Some(address) => Ok(address),
            None => Ok(endpoints[self.rng.random_range(0..endpoints.len())].clone()),
        }
    }

    fn report_result(&mut self, service: &str, endpoint: &str, latency_seconds: f64, _: bool) {
        self.ewma.observe(service, endpoint, latency_seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses(addrs: &[&str]) -> Vec<String> {
        addrs.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn all_baselines_fail_without_endpoints() {
        let mut strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(Random::new(1)),
            Box::new(RoundRobin::new()),
            Box::new(PowerOfTwoChoices::new(2, 0.2)),
            Box::new(LeastLatency::new(3, 0.2)),
        ];
        for strategy in strategies.iter_mut() {
            strategy.add_service("empty", &[]);
            assert_eq!(
                strategy.pick_endpoint("empty"),
                Err(PickError::no_endpoints("empty")),
                "{} accepted an empty service",
                strategy.name()
            );
            assert_eq!(
                strategy.pick_endpoint("missing"),
                Err(PickError::no_endpoints("missing")),
                "{} accepted an unknown service",
                strategy.name()
            );
        }
    }

    #[test]
    fn round_robin_cycles_in_registration_order() {
        let mut rr = RoundRobin::new();
        rr.add_service("svc", &addresses(&["a", "b", "c"]));

        let picks: Vec<String> = (0..6).map(|_| rr.pick_endpoint("svc").unwrap()).collect();
        assert_eq!(picks, vec!["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn power_of_two_prefers_the_faster_of_its_pair() {
        let mut p2c = PowerOfTwoChoices::new(7, 0.2);
        p2c.add_service("svc", &addresses(&["fast", "slow"]));
        p2c.report_result("svc", "fast", 0.010, true);
        p2c.report_result("svc", "slow", 0.200, true);

        // With two endpoints every pair is {fast, slow}.
        for _ in 0..50 {
            assert_eq!(p2c.pick_endpoint("svc").unwrap(), "fast");
        }
    }

    #[test]
    fn power_of_two_prefers_unseen_endpoints() {
        let mut p2c = PowerOfTwoChoices::new(7, 0.2);
        p2c.add_service("svc", &addresses(&["seen", "unseen"]));
        p2c.report_result("svc", "seen", 0.001, true);

        for _ in 0..50 {
            assert_eq!(p2c.pick_endpoint("svc").unwrap(), "unseen");
        }
    }

    #[test]
    fn least_latency_tracks_the_global_minimum() {
        let mut ll = LeastLatency::new(7, 0.2);
        ll.add_service("svc", &addresses(&["a", "b", "c"]));
        ll.report_result("svc", "a", 0.050, true);
        ll.report_result("svc", "b", 0.020, true);
        ll.report_result("svc", "c", 0.080, true);

        assert_eq!(ll.pick_endpoint("svc").unwrap(), "b");

        // Keep reporting slower values for b until a wins.
        for _ in 0..30 {
            ll.report_result("svc", "b", 0.300, true);
        }
        assert_eq!(ll.pick_endpoint("svc").unwrap(), "a");
    }

    #[test]
    fn ewma_smoothing_blends_observations() {
        let mut table = EwmaTable::new(0.5);
        table.observe("svc", "a", 0.100);
        table.observe("svc", "a", 0.200);
        assert!((table.get("svc", "a") - 0.150).abs() < 1e-12);
    }
}
