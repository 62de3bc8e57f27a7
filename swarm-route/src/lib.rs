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

//! Client-side adaptive load balancing driven by per-endpoint pheromones.
//!
//! Every registered endpoint carries a pair of pheromone levels per QoS
//! channel: positive pheromone accumulates when calls succeed quickly,
//! negative pheromone accumulates when calls fail or come back too slow.
//! [`SwarmRouter::pick_endpoint`] draws a weighted-random endpoint biased
//! toward high positive and low negative pheromone, and the caller feeds
//! observed outcomes back through [`SwarmRouter::report_result`].
//!
//! Stale evidence is forgotten two ways: a background task decays all
//! pheromones once per second, and an optional per-request decay gives a
//! predictable half-life measured in reports instead of wall-clock time.
//!
//! The router is an in-memory decision engine. It performs no I/O; the
//! caller dispatches the actual requests and measures their outcomes.

pub mod error;
pub mod router;

pub use error::PickError;
pub use router::{Pheromone, PheromoneSnapshot, SwarmRouter};
