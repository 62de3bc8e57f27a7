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

//! The common capability set implemented by every balancer under test.

use swarm_route::PickError;

/// A client-side balancing strategy.
///
/// Intentionally aligned with the router's public operations so the
/// simulator treats the baselines and the router adapter uniformly.
pub trait Strategy: Send {
    /// Short display name used in reports.
    fn name(&self) -> &'static str;

    /// Registers a service with its endpoint addresses, replacing any
    /// previous registration.
    fn add_service(&mut self, name: &str, endpoints: &[String]);

    /// Selects an endpoint for the service.
    ///
    /// Fails with [`PickError::NoEndpoints`] when the service is unknown or
    /// has no endpoints.
    fn pick_endpoint(&mut self, service: &str) -> Result<String, PickError>;

    /// Feeds an observed call outcome back into the strategy.
    fn report_result(&mut self, service: &str, endpoint: &str, latency_seconds: f64, success: bool);
}
