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

//! End-to-end router behavior through the public API, with pinned seeds.

use std::time::Duration;

use swarm_route::{PickError, SwarmRouter};

fn levels(router: &SwarmRouter, service: &str, addr: &str) -> (f64, f64) {
    let snapshot = router.pheromone_snapshot();
    let p = snapshot[service][addr];
    (p.pos, p.neg)
}

#[test_log::test(tokio::test)]
async fn selection_biases_toward_lower_latency() {
    let router = SwarmRouter::with_seed(7);
    router.set_evaporation_rate(0.0);
    router.add_service("api", ["a", "b"]);

    for _ in 0..200 {
        router.report_result("api", "a", 0.01, true);
        router.report_result("api", "b", 0.5, true);
    }

    let (pos_a, _) = levels(&router, "api", "a");
    let (pos_b, _) = levels(&router, "api", "b");
    assert!(
        pos_a > pos_b && pos_a > 0.0,
        "expected a to out-accumulate b: pos_a={pos_a} pos_b={pos_b}"
    );

    let total = 1000;
    let picks_a = (0..total)
        .filter(|_| router.pick_endpoint("api").unwrap() == "a")
        .count();
    assert!(
        picks_a >= total * 9 / 10,
        "expected strong bias toward a, got {picks_a}/{total}"
    );
}

#[test_log::test(tokio::test)]
async fn repeated_failures_exile_an_endpoint() {
    let router = SwarmRouter::with_seed(11);
    router.set_evaporation_rate(0.0);
    router.add_service("svc", ["a", "b"]);

    for _ in 0..100 {
        router.report_result("svc", "b", 0.0, false);
    }

    let total = 1000;
    let picks_b = (0..total)
        .filter(|_| router.pick_endpoint("svc").unwrap() == "b")
        .count();
    assert!(
        picks_b <= total / 20,
        "expected b to be rarely chosen, got {picks_b}/{total}"
    );
}

#[test_log::test(tokio::test)]
async fn success_reduces_accumulated_error() {
    let router = SwarmRouter::with_seed(23);
    router.add_service("svc", ["a"]);

    router.report_result("svc", "a", 0.0, false);
    let (_, neg_before) = levels(&router, "svc", "a");
    assert!(neg_before > 0.0);

    router.set_evaporation_rate(0.4);
    router.report_result("svc", "a", 0.05, true);

    let (_, neg_after) = levels(&router, "svc", "a");
    assert!(neg_after <= neg_before, "error pheromone must never grow on success");
    assert!(
        neg_after >= neg_before * 0.6 - 1e-9,
        "success forgives at most one evaporation factor: before={neg_before} after={neg_after}"
    );
}

#[test_log::test(tokio::test(start_paused = true))]
async fn background_task_decays_both_levels() {
    let router = SwarmRouter::with_seed(99);
    router.set_evaporation_rate(0.5);
    router.add_service("svc", ["a"]);

    router.report_result("svc", "a", 0.01, true);
    router.report_result("svc", "a", 0.0, false);

    let (pos_before, neg_before) = levels(&router, "svc", "a");
    assert!(pos_before > 0.0 && neg_before > 0.0);

    // Just over one tick interval; paused time advances deterministically.
    tokio::time::sleep(Duration::from_millis(1200)).await;

    let (pos_after, neg_after) = levels(&router, "svc", "a");
    assert!(pos_after < pos_before, "pos did not decay: {pos_before} -> {pos_after}");
    assert!(neg_after < neg_before, "neg did not decay: {neg_before} -> {neg_after}");

    router.shutdown().await;
}

#[test_log::test(tokio::test)]
async fn no_endpoints_error_names_the_service() {
    let router = SwarmRouter::with_seed(1);
    let err = router.pick_endpoint("billing").unwrap_err();
    assert_eq!(err, PickError::no_endpoints("billing"));
    assert_eq!(err.to_string(), "no endpoints for service billing");
}

#[test_log::test(tokio::test)]
async fn snapshot_covers_all_services_and_endpoints() {
    let router = SwarmRouter::with_seed(2);
    router.add_service("api", ["a", "b"]);
    router.add_service("db", ["x"]);

    let snapshot = router.pheromone_snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot["api"].len(), 2);
    assert_eq!(snapshot["db"].len(), 1);
    for endpoints in snapshot.values() {
        for levels in endpoints.values() {
            assert_eq!((levels.pos, levels.neg), (0.0, 0.0));
        }
    }
}

#[test_log::test(tokio::test)]
async fn reregistration_resets_pheromones() {
    let router = SwarmRouter::with_seed(3);
    router.add_service("svc", ["a", "b"]);
    router.report_result("svc", "a", 0.01, true);
    router.report_result("svc", "b", 0.0, false);

    router.add_service("svc", ["b", "c"]);

    let snapshot = router.pheromone_snapshot();
    let endpoints = &snapshot["svc"];
    assert_eq!(endpoints.len(), 2);
    assert_eq!((endpoints["b"].pos, endpoints["b"].neg), (0.0, 0.0));
    assert_eq!((endpoints["c"].pos, endpoints["c"].neg), (0.0, 0.0));
    assert!(!endpoints.contains_key("a"));
}
