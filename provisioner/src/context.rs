// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared state for one provisioning run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use slog::{info, warn, Logger};
use uuid::Uuid;

use crate::client::{CloudComputeClient, RemoteAccessProbe};
use crate::metrics::Metrics;

/// Cooperative external signal requesting early abort of the current run.
///
/// Clones share the underlying flag. The flag is only consulted between
/// poll iterations; an in-flight provider call always runs to completion.
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The machine record owned by the host pipeline.
///
/// The instance id is written here the instant it is known, before any
/// readiness waiting, so a later timeout can still roll the instance back.
#[derive(Clone, Debug)]
pub struct MachineRecord {
    pub id: Uuid,
    pub name: String,
    pub instance_id: Option<String>,
}

impl MachineRecord {
    pub fn new(name: &str) -> MachineRecord {
        MachineRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            instance_id: None,
        }
    }

    pub fn set_instance_id(&mut self, instance_id: &str) {
        self.instance_id = Some(instance_id.to_string());
    }
}

/// User-facing message sink with info and warning severities, distinct from
/// this crate's own diagnostic logging.
pub trait MessageSink: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// A [`MessageSink`] that forwards user-facing messages to a [`Logger`].
pub struct SlogMessageSink {
    log: Logger,
}

impl SlogMessageSink {
    pub fn new(log: Logger) -> SlogMessageSink {
        SlogMessageSink { log }
    }
}

impl MessageSink for SlogMessageSink {
    fn info(&self, message: &str) {
        info!(self.log, "{}", message);
    }

    fn warn(&self, message: &str) {
        warn!(self.log, "{}", message);
    }
}

/// Handle to the pipeline's action runner, able to invoke the external
/// destroy workflow. Implementations must tolerate being re-entered from
/// within an already-active run, since rollback happens mid-provision.
#[async_trait]
pub trait ActionRunner: Send + Sync {
    async fn run_destroy(
        &self,
        ctx: &ProvisioningContext,
    ) -> Result<(), anyhow::Error>;
}

/// Behavioral flags a context carries into sub-workflows.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RunFlags {
    /// Destructive actions proceed without prompting.
    pub confirm_destructive: bool,
    /// Sub-workflows re-validate the machine configuration on entry.
    pub revalidate_config: bool,
}

impl Default for RunFlags {
    fn default() -> RunFlags {
        RunFlags { confirm_destructive: false, revalidate_config: true }
    }
}

/// The single mutable state shared by all components of one provisioning
/// run. There is exactly one run in flight per context, so no locking
/// discipline applies beyond the atomic interrupt flag.
#[derive(Clone)]
pub struct ProvisioningContext {
    pub machine: MachineRecord,
    pub metrics: Metrics,
    pub messages: Arc<dyn MessageSink>,
    pub interrupt: InterruptFlag,
    pub flags: RunFlags,
    pub client: Arc<dyn CloudComputeClient>,
    pub remote: Arc<dyn RemoteAccessProbe>,
    pub actions: Arc<dyn ActionRunner>,
}

impl ProvisioningContext {
    /// Build the sanitized copy handed to the destroy workflow: a fresh
    /// (unset) interrupt flag, destructive confirmation forced on, and
    /// config re-validation disabled.
    pub fn sanitized_for_destroy(&self) -> ProvisioningContext {
        let mut copy = self.clone();
        copy.interrupt = InterruptFlag::default();
        copy.flags.confirm_destructive = true;
        copy.flags.revalidate_config = false;
        copy
    }
}
