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

//! Authoritative pheromone state for all registered services.
//!
//! The router exclusively owns everything in here. Snapshots hand out
//! copies, never references, so callers cannot observe torn writes or
//! mutate router state.

use std::collections::HashMap;

use crate::router::tuning::Tuning;

/// Positive and negative pheromone levels for one QoS channel.
///
/// `pos` accumulates evidence that an endpoint is desirable, `neg` that it
/// is not. Both start at zero and stay in `[0, +inf)`: reinforcement only
/// adds non-negative amounts and evaporation multiplies by a factor in
/// `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pheromone {
    /// Accumulated desirability evidence.
    pub pos: f64,
    /// Accumulated fault evidence.
    pub neg: f64,
}

impl Pheromone {
    /// Multiplies both levels by `1 - rate`.
    pub(crate) fn evaporate(&mut self, rate: f64) {
        let factor = 1.0 - rate;
        self.pos *= factor;
        self.neg *= factor;
    }
}

/// A named QoS dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Fast-success credit accumulates in this channel's `pos`.
    Latency,
    /// Fault credit accumulates in this channel's `neg`.
    Error,
}

/// Pheromone pairs for every tracked channel of one endpoint.
///
/// Channels are a fixed struct rather than a keyed map so the hot path
/// never hashes channel names; a new QoS dimension is a new field plus a
/// [`Channel`] variant. Selection consumes only `latency.pos` and
/// `error.neg`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelPheromones {
    /// Latency channel.
    pub latency: Pheromone,
    /// Error channel.
    pub error: Pheromone,
}

impl ChannelPheromones {
    /// Returns the pheromone pair for `channel`.
    pub fn channel(&self, channel: Channel) -> &Pheromone {
        match channel {
            Channel::Latency => &self.latency,
            Channel::Error => &self.error,
        }
    }

    /// Returns the mutable pheromone pair for `channel`.
    pub fn channel_mut(&mut self, channel: Channel) -> &mut Pheromone {
        match channel {
            Channel::Latency => &mut self.latency,
            Channel::Error => &mut self.error,
        }
    }

    /// Applies `f` to the pheromone pair of every channel.
    pub(crate) fn for_each_mut(&mut self, mut f: impl FnMut(&mut Pheromone)) {
        f(&mut self.latency);
        f(&mut self.error);
    }
}

/// A service instance addressed by an opaque string.
#[derive(Debug)]
pub(crate) struct EndpointState {
    /// Opaque endpoint address, as supplied at registration.
    pub address: String,
    /// Per-channel pheromone levels.
    pub pheromones: ChannelPheromones,
}

impl EndpointState {
    fn new(address: String) -> Self {
        EndpointState {
            address,
            pheromones: ChannelPheromones::default(),
        }
    }
}

/// A registered service and its endpoints.
#[derive(Debug, Default)]
pub(crate) struct Service {
    /// Endpoints in caller-supplied insertion order. The order is preserved
    /// for deterministic iteration under a seeded PRNG.
    pub endpoints: Vec<EndpointState>,
}

/// Snapshot shape: service name to endpoint address to the
/// `(latency.pos, error.neg)` projection the selector consumes.
pub type PheromoneSnapshot = HashMap<String, HashMap<String, Pheromone>>;

/// All mutable router state, guarded by a single lock in the router.
#[derive(Debug)]
pub(crate) struct RouterState {
    /// Registered services by name.
    pub services: HashMap<String, Service>,
    /// Monotonic per-service pick counters for periodic exploration.
    ///
    /// Kept beside the service map instead of inside [`Service`]: re-registering
    /// a service replaces its endpoints and pheromones but must not reset the
    /// counter, or seeded runs would stop being reproducible across
    /// re-registrations.
    pub pick_counts: HashMap<String, u64>,
    /// Tuning parameters.
    pub tuning: Tuning,
}

impl RouterState {
    pub fn new() -> Self {
        RouterState {
            services: HashMap::new(),
            pick_counts: HashMap::new(),
            tuning: Tuning::default(),
        }
    }

    /// Registers `name` with fresh endpoints in the supplied order.
    ///
    /// Replaces any existing record under `name`, discarding its pheromone
    /// state. An empty address list registers a service that will always
    /// fail selection.
    pub fn register_service(&mut self, name: &str, addresses: Vec<String>) {
        let endpoints = addresses.into_iter().map(EndpointState::new).collect();
        self.services.insert(name.to_string(), Service { endpoints });
    }

    /// Locates an endpoint by address within a service, for mutation.
    pub fn endpoint_mut(&mut self, service: &str, address: &str) -> Option<&mut EndpointState> {
        self.services
            .get_mut(service)?
            .endpoints
            .iter_mut()
            .find(|ep| ep.address == address)
    }

    /// Deep-copied projection of current pheromone levels.
    pub fn snapshot(&self) -> PheromoneSnapshot {
        self.services
            .iter()
            .map(|(name, service)| {
                let endpoints = service
                    .endpoints
                    .iter()
                    .map(|ep| {
                        let levels = Pheromone {
                            pos: ep.pheromones.latency.pos,
                            neg: ep.pheromones.error.neg,
                        };
                        (ep.address.clone(), levels)
                    })
                    .collect();
                (name.clone(), endpoints)
            })
            .collect()
    }

    /// Multiplies every pheromone of every endpoint of every service by
    /// `1 - rate`.
    pub fn evaporate_all(&mut self, rate: f64) {
        for service in self.services.values_mut() {
            for endpoint in service.endpoints.iter_mut() {
                endpoint.pheromones.for_each_mut(|p| p.evaporate(rate));
            }
        }
    }
}
