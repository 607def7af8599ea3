// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Advisory duration capture for the readiness phases.
//!
//! Metrics are purely observational; nothing reads them back to make
//! control-flow decisions.

use std::collections::BTreeMap;
use std::time::Duration;

/// Metric name for the provider-ready wait.
pub const METRIC_INSTANCE_READY: &str = "instance_ready";
/// Metric name for the remote-access wait.
pub const METRIC_REMOTE_ACCESS_READY: &str = "remote_access_ready";

/// Named duration entries recorded during a provisioning run.
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    durations: BTreeMap<String, Duration>,
}

impl Metrics {
    pub fn record(&mut self, name: &str, duration: Duration) {
        self.durations.insert(name.to_string(), duration);
    }

    pub fn get(&self, name: &str) -> Option<Duration> {
        self.durations.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.durations.iter().map(|(name, d)| (name.as_str(), *d))
    }
}
