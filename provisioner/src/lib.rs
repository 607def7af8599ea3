// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Provisions a single cloud compute instance as one stage of a larger
//! machine-lifecycle pipeline.
//!
//! The flow is launch → poll → rollback: a declarative [`LaunchSpec`] is
//! turned into provider-call parameters, an instance is allocated either
//! on-demand or through a spot bid, the asynchronous provider API is polled
//! until the instance is both provider-ready and remotely reachable, and the
//! instance is terminated (via the host pipeline's destroy workflow) on
//! timeout, provider error, or external interruption.
//!
//! Everything outside that orchestration (credential resolution, the
//! destroy workflow's internals, CLI handling) belongs to the host pipeline
//! and is consumed here through the narrow traits in [`client`] and
//! [`context`].

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod poll;
pub mod provision;
pub mod readiness;
pub mod rollback;
pub mod spec;
pub mod spot;

#[cfg(test)]
mod test_support;

pub use client::CloudComputeClient;
pub use config::Config;
pub use context::ProvisioningContext;
pub use error::Error;
pub use provision::{ProvisionOutcome, Provisioner};
pub use spec::LaunchSpec;
