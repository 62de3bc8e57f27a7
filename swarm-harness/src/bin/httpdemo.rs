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

//! Live HTTP comparison demo.
//!
//! Spins up three local endpoints with simulated latency and error behavior
//! (one of them degrades for a time window), then drives each strategy
//! through real HTTP requests and prints success rate, latency percentiles
//! and how much traffic landed on the degraded endpoint during its bad
//! window.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use anyhow::Result;
use axum::{Router, extract::State, http::StatusCode, routing::get};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use swarm_harness::{Strategy, default_strategies, sim::summarize_latency};
use tokio::{net::TcpListener, task::JoinHandle};

const SERVICE: &str = "api";
const REQUESTS_PER_STRATEGY: usize = 1000;
const DEGRADE_START: Duration = Duration::from_secs(4);
const DEGRADE_END: Duration = Duration::from_secs(12);

/// Simulated behavior of one demo endpoint.
struct EndpointSim {
    base_latency_sec: f64,
    jitter_sec: f64,
    base_error_rate: f64,
    /// Latency and error rate during the degrade window, if this is the
    /// endpoint being degraded.
    degraded: Option<(f64, f64)>,
    started: Instant,
    rng: Mutex<ChaCha8Rng>,
}

impl EndpointSim {
    fn healthy(latency_sec: f64, jitter_sec: f64, error_rate: f64, started: Instant) -> Self {
        EndpointSim {
            base_latency_sec: latency_sec,
            jitter_sec,
            base_error_rate: error_rate,
            degraded: None,
            started,
            rng: Mutex::new(ChaCha8Rng::from_os_rng()),
        }
    }

    fn degrading(
        latency_sec: f64,
        jitter_sec: f64,
        error_rate: f64,
        degraded_latency_sec: f64,
        degraded_error_rate: f64,
        started: Instant,
    ) -> Self {
        EndpointSim {
            degraded: Some((degraded_latency_sec, degraded_error_rate)),
            ..Self::healthy(latency_sec, jitter_sec, error_rate, started)
        }
    }
}

async fn handle(State(sim): State<Arc<EndpointSim>>) -> (StatusCode, &'static str) {
    let elapsed = sim.started.elapsed();
    let (mean, error_rate) = match sim.degraded {
        Some(degraded) if elapsed >= DEGRADE_START && elapsed < DEGRADE_END => degraded,
        _ => (sim.base_latency_sec, sim.base_error_rate),
    };

    let (sleep_sec, failed) = {
        let mut rng = sim.rng.lock().unwrap();
        let noise: f64 = rng.sample(StandardNormal);
        let sampled = (mean + noise * sim.jitter_sec).clamp(0.2 * mean, 5.0 * mean);
        (sampled, rng.random::<f64>() < error_rate)
    };
    tokio::time::sleep(Duration::from_secs_f64(sleep_sec)).await;

    match failed {
        true => (StatusCode::INTERNAL_SERVER_ERROR, "error"),
        false => (StatusCode::OK, "ok"),
    }
}

async fn serve(sim: EndpointSim, addr: &str) -> Result<JoinHandle<()>> {
    let app = Router::new().route("/", get(handle)).with_state(Arc::new(sim));
    let listener = TcpListener::bind(addr).await?;
    Ok(tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    }))
}

struct RunStats {
    total: usize,
    success: usize,
    mean_ms: f64,
    p95_ms: f64,
    selection: BTreeMap<String, usize>,
    bad_window_share: f64,
}

async fn drive(
    client: &reqwest::Client,
    strategy: &mut dyn Strategy,
    degraded: &str,
    started: Instant,
) -> RunStats {
    let mut selection: BTreeMap<String, usize> = BTreeMap::new();
    let mut latencies_ms = Vec::with_capacity(REQUESTS_PER_STRATEGY);
    let mut success = 0;
    let mut bad_window_total = 0usize;
    let mut bad_window_degraded = 0usize;

    for _ in 0..REQUESTS_PER_STRATEGY {
        let Ok(addr) = strategy.pick_endpoint(SERVICE) else {
            continue;
        };
        *selection.entry(addr.clone()).or_insert(0) += 1;

        let begin = Instant::now();
        let response = client.get(format!("http://{addr}/")).send().await;
        let latency = begin.elapsed();
        let ok = response.is_ok_and(|r| r.status() == StatusCode::OK);
        strategy.report_result(SERVICE, &addr, latency.as_secs_f64(), ok);

        let elapsed = started.elapsed();
        if elapsed >= DEGRADE_START && elapsed < DEGRADE_END {
            bad_window_total += 1;
            if addr == degraded {
                bad_window_degraded += 1;
            }
        }

        if ok {
            success += 1;
            latencies_ms.push(latency.as_secs_f64() * 1000.0);
        }
    }

    let (mean_ms, p95_ms) = summarize_latency(&latencies_ms);
    let bad_window_share = match bad_window_total {
        0 => 0.0,
        total => 100.0 * bad_window_degraded as f64 / total as f64,
    };
    RunStats {
        total: REQUESTS_PER_STRATEGY,
        success,
        mean_ms,
        p95_ms,
        selection,
        bad_window_share,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    for mut strategy in default_strategies() {
        // Fresh servers per strategy so the degrade window aligns with each run.
        let started = Instant::now();
        let a = "127.0.0.1:8091";
        let b = "127.0.0.1:8092"; // the degraded one
        let c = "127.0.0.1:8093";
        let servers = [
            serve(EndpointSim::healthy(0.030, 0.009, 0.01, started), a).await?,
            serve(
                EndpointSim::degrading(0.035, 0.0105, 0.01, 0.120, 0.20, started),
                b,
            )
            .await?,
            serve(EndpointSim::healthy(0.040, 0.012, 0.02, started), c).await?,
        ];
        tokio::time::sleep(Duration::from_millis(200)).await;

        println!(
            "HTTP demo ({}): degrade={DEGRADE_START:?}..{DEGRADE_END:?} on {b}",
            strategy.name()
        );
        let endpoints: Vec<String> = [a, b, c].iter().map(|s| s.to_string()).collect();
        strategy.add_service(SERVICE, &endpoints);

        let stats = drive(&client, strategy.as_mut(), b, started).await;
        println!(
            "{}: success={}/{} ({:.1}%), mean={:.1}ms p95={:.1}ms, bad-window share={:.2}%",
            strategy.name(),
            stats.success,
            stats.total,
            100.0 * stats.success as f64 / stats.total as f64,
            stats.mean_ms,
            stats.p95_ms,
            stats.bad_window_share
        );
        for (addr, count) in &stats.selection {
            println!("  {addr}: {count}");
        }

        for server in servers {
            server.abort();
        }
        // Give the sockets a moment to release before the next strategy binds.
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    Ok(())
}
