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

//! Compares all strategies on the base scenario: two healthy endpoints plus
//! one that degrades mid-run and later recovers.

use swarm_harness::{default_strategies, scenarios, sim};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Pinned seed for reproducible runs; printed so results can be compared.
    let scenario = scenarios::base(123_456_789);
    println!("seed={}", scenario.seed);

    let mut strategies = default_strategies();
    for results in sim::run_all(&scenario, &mut strategies) {
        print!("{results}");
    }
}
