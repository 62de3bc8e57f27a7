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

//! Canned scenarios shared by the comparison and experiment binaries.

use crate::sim::{BAD_WINDOW_END, BAD_WINDOW_START, EndpointSpec, EnvironmentEvent, Scenario};

fn degrade(step: usize, endpoint: &str, mean_latency: f64, error_rate: f64) -> EnvironmentEvent {
    EnvironmentEvent {
        step,
        endpoint: endpoint.to_string(),
        new_mean_latency: Some(mean_latency),
        new_jitter_sec: None,
        new_error_rate: Some(error_rate),
    }
}

/// Three healthy endpoints; `b` degrades at step 2000 and recovers at 6000.
pub fn base(seed: u64) -> Scenario {
    let a = EndpointSpec::new("http://a:8080", 0.030, 0.009, 0.01);
    let b = EndpointSpec::new("http://b:8080", 0.035, 0.0105, 0.01);
    let c = EndpointSpec::new("http://c:8080", 0.040, 0.012, 0.02);

    let events = vec![
        degrade(BAD_WINDOW_START, &b.addr, 0.120, 0.20),
        degrade(BAD_WINDOW_END, &b.addr, b.mean_latency_sec, b.error_rate),
    ];

    Scenario {
        service: "api".to_string(),
        endpoints: vec![a, b, c],
        events,
        total_requests: 10_000,
        seed,
    }
}

/// Ten endpoints with a latency spread; two degrade at different times.
pub fn many_endpoints(seed: u64) -> Scenario {
    let endpoints: Vec<EndpointSpec> = (0..10)
        .map(|i| {
            let mean = 0.028 + i as f64 * 0.004; // 28ms..64ms
            EndpointSpec::new(&format!("http://e{}:8080", i + 1), mean, 0.3 * mean, 0.01)
        })
        .collect();

    let events = vec![
        degrade(BAD_WINDOW_START, &endpoints[2].addr, 0.120, 0.25),
        degrade(3500, &endpoints[6].addr, 0.120, 0.25),
        degrade(7000, &endpoints[2].addr, endpoints[2].mean_latency_sec, 0.01),
        degrade(8000, &endpoints[6].addr, endpoints[6].mean_latency_sec, 0.01),
    ];

    Scenario {
        service: "api".to_string(),
        endpoints,
        events,
        total_requests: 12_000,
        seed,
    }
}

/// `b` ramps its latency 35ms -> 120ms over steps 2000..4000, then ramps
/// back down over 6000..8000.
pub fn drift(seed: u64) -> Scenario {
    let a = EndpointSpec::new("http://a:8080", 0.030, 0.009, 0.01);
    let b = EndpointSpec::new("http://b:8080", 0.035, 0.0105, 0.01);
    let c = EndpointSpec::new("http://c:8080", 0.040, 0.012, 0.02);

    let mut events = Vec::new();
    for i in 0..=10 {
        let fraction = i as f64 / 10.0;
        events.push(EnvironmentEvent {
            step: 2000 + i * 200,
            endpoint: b.addr.clone(),
            new_mean_latency: Some(0.035 + (0.120 - 0.035) * fraction),
            new_jitter_sec: None,
            new_error_rate: None,
        });
    }
    events.push(EnvironmentEvent {
        step: 3000,
        endpoint: b.addr.clone(),
        new_mean_latency: None,
        new_jitter_sec: None,
        new_error_rate: Some(0.20),
    });
    for i in 0..=10 {
        let fraction = i as f64 / 10.0;
        events.push(EnvironmentEvent {
            step: 6000 + i * 200,
            endpoint: b.addr.clone(),
            new_mean_latency: Some(0.120 - (0.120 - 0.035) * fraction),
            new_jitter_sec: None,
            new_error_rate: None,
        });
    }
    events.push(EnvironmentEvent {
        step: 8000,
        endpoint: b.addr.clone(),
        new_mean_latency: None,
        new_jitter_sec: None,
        new_error_rate: Some(b.error_rate),
    });

    Scenario {
        service: "api".to_string(),
        endpoints: vec![a, b, c],
        events,
        total_requests: 10_000,
        seed,
    }
}

/// A very fast endpoint turns flaky (~35% errors) during the bad window.
pub fn flaky_fast(seed: u64) -> Scenario {
    let fast = EndpointSpec::new("http://fast:8080", 0.020, 0.006, 0.05);
    let med = EndpointSpec::new("http://med:8080", 0.035, 0.0105, 0.01);
    let slow = EndpointSpec::new("http://slow:8080", 0.045, 0.0135, 0.01);

    let events = vec![
        EnvironmentEvent {
            step: BAD_WINDOW_START,
            endpoint: fast.addr.clone(),
            new_mean_latency: None,
            new_jitter_sec: None,
            new_error_rate: Some(0.35),
        },
        EnvironmentEvent {
            step: BAD_WINDOW_END,
            endpoint: fast.addr.clone(),
            new_mean_latency: None,
            new_jitter_sec: None,
            new_error_rate: Some(fast.error_rate),
        },
    ];

    Scenario {
        service: "api".to_string(),
        endpoints: vec![fast, med, slow],
        events,
        total_requests: 10_000,
        seed,
    }
}
