// Copyright 2026 The plexec Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Executive configuration, grounded on the `load_config` pattern in
//! `examples/PierreNowak-risingwave/src/frontend/src/session.rs`, scoped down
//! to the one file format this core actually reads (spec §6's resource
//! hierarchy) plus a couple of cooperative-scheduling knobs from spec §5.

use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct ExecutiveConfig {
    pub resource_hierarchy_path: Option<PathBuf>,
    /// Soft cap on macro-steps run by a single `run_to_quiescence` call;
    /// `None` means run until naturally quiescent. Exists only to bound
    /// runaway plans in tests and tools, not part of the scheduling
    /// contract itself.
    pub max_cycles_per_call: Option<u32>,
    /// Diagnostic-only: `tracing::warn!` once a mutex's waiter list grows
    /// past this length.
    pub mutex_waiter_warn_threshold: usize,
}

impl ExecutiveConfig {
    pub fn from_env() -> Self {
        ExecutiveConfig {
            resource_hierarchy_path: std::env::var_os("PLAN_EXEC_RESOURCE_HIERARCHY").map(PathBuf::from),
            max_cycles_per_call: std::env::var("PLAN_EXEC_MAX_CYCLES")
                .ok()
                .and_then(|v| v.parse().ok()),
            mutex_waiter_warn_threshold: std::env::var("PLAN_EXEC_MUTEX_WAITER_WARN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(16),
        }
    }
}
