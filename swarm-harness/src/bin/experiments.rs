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

//! Multi-seed experiment driver: runs every strategy over four scenarios of
//! increasing difficulty and prints mean ± stddev per headline metric.

use swarm_harness::{aggregate::aggregate_multi_seed, default_strategies, scenarios, sim::Scenario};

const SEEDS: [u64; 6] = [1, 2, 3, 42, 123_456, 987_654_321];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("seeds={SEEDS:?}");

    let experiments: [(&str, Scenario); 4] = [
        (
            "Base scenario (3 endpoints, degrade b at 2000, recover at 6000)",
            scenarios::base(0),
        ),
        (
            "Harder A: 10 endpoints; degrade e3 at 2000 and e7 at 3500; recover later",
            scenarios::many_endpoints(0),
        ),
        (
            "Harder B: drift (b ramps latency 35->120ms over 2000..4000, recovers 6000..8000)",
            scenarios::drift(0),
        ),
        (
            "Harder C: flaky-but-fast (one very fast endpoint with ~35% errors)",
            scenarios::flaky_fast(0),
        ),
    ];

    for (title, scenario) in experiments {
        println!("\n=== {title} ===");
        let mut strategies = default_strategies();
        for aggregate in aggregate_multi_seed(&scenario, &mut strategies, &SEEDS) {
            println!("{aggregate}");
        }
    }
}
