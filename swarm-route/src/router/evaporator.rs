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

//! Background wall-clock decay of all pheromone state.
//!
//! A single task ticks once per second and multiplies every pheromone by
//! `1 - evaporation_rate`, letting the router forget outdated information.
//! The task's lifetime is bound to the router: it holds only a weak
//! reference to the shared state and a cancellation token, so it exits
//! promptly when the router is dropped or shut down. It never holds the
//! state lock while sleeping.

use std::{sync::Weak, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::router::RouterShared;

/// Handle to the background evaporation task.
///
/// Dropping the handle cancels the task; [`EvaporatorTask::shutdown`]
/// additionally joins it so teardown is deterministic.
pub(crate) struct EvaporatorTask {
    task: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl EvaporatorTask {
    /// Spawns the decay loop ticking every `tick`.
    pub(crate) fn spawn(shared: Weak<RouterShared>, tick: Duration) -> Self {
        let cancel_token = CancellationToken::new();
        let task = {
            let cancel_token = cancel_token.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(tick);
                // The first interval tick completes immediately; consume it
                // so a full period elapses before the first decay.
                interval.tick().await;
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let Some(shared) = shared.upgrade() else {
                                break;
                            };
                            evaporate_once(&shared);
                        }
                        _ = cancel_token.cancelled() => {
                            break;
                        }
                    }
                }
                tracing::debug!("evaporation task exiting");
            })
        };

        EvaporatorTask {
            task: Some(task),
            cancel_token,
        }
    }

    /// Cancels the task and waits for it to exit.
    pub(crate) async fn shutdown(mut self) {
        self.cancel_token.cancel();
        if let Some(task) = self.task.take() {
            task.await.ok();
        }
    }
}

impl Drop for EvaporatorTask {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Applies a single decay step to every pheromone of every endpoint of
/// every service.
pub(crate) fn evaporate_once(shared: &RouterShared) {
    let mut state = shared.state.write().unwrap();
    let rate = state.tuning.evaporation_rate;
    state.evaporate_all(rate);
    tracing::trace!(rate, "evaporation step applied");
}
