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

//! Router error types.

/// Errors that can occur when picking an endpoint.
///
/// This is the only failure the router surfaces. Reports for unknown
/// services or addresses are silent no-ops, and out-of-domain tuning values
/// are clamped rather than rejected: the router sits on the hot request
/// path and those conditions leave the caller with no corrective action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PickError {
    /// The service is unknown or was registered with zero endpoints.
    #[error("no endpoints for service {service}")]
    NoEndpoints {
        /// Name of the service the pick was attempted for.
        service: String,
    },
}

impl PickError {
    /// Creates a [`PickError::NoEndpoints`] for the given service.
    pub fn no_endpoints(service: impl Into<String>) -> Self {
        PickError::NoEndpoints {
            service: service.into(),
        }
    }
}
