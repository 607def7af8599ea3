// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Top-level sequencing for one provisioning run.

use std::time::Duration;

use slog::{info, o, Logger};
use tokio::time::Instant;

use crate::client::Instance;
use crate::config::Config;
use crate::context::ProvisioningContext;
use crate::error::Error;
use crate::metrics::{METRIC_INSTANCE_READY, METRIC_REMOTE_ACCESS_READY};
use crate::readiness::{self, WaitOutcome};
use crate::rollback;
use crate::spec::LaunchSpec;
use crate::spot::SpotRequestPoller;

/// How a run that did not fail ended.
#[derive(Clone, Debug, PartialEq)]
pub enum ProvisionOutcome {
    /// The instance is booted and remotely reachable; the pipeline's next
    /// stage may proceed.
    Provisioned(Instance),
    /// The provider call yielded no instance (an unresolved spot request).
    /// Not a failure at this layer: the pipeline continuation still runs,
    /// there is just nothing to wait on or roll back.
    NoInstance,
    /// The run was interrupted externally and the instance was terminated.
    RolledBack,
}

/// Orchestrates launch → readiness gate → rollback for a single instance.
pub struct Provisioner {
    log: Logger,
    config: Config,
}

impl Provisioner {
    pub fn new(log: &Logger, config: Config) -> Provisioner {
        Provisioner {
            log: log.new(o!("component" => "Provisioner")),
            config,
        }
    }

    /// Run the full launch → poll → rollback sequence described by `spec`.
    ///
    /// A readiness timeout terminates the instance before surfacing
    /// [`Error::InstanceReadyTimeout`], so an error return never leaves an
    /// instance running. External interruption is not an error: the run
    /// rolls back and completes with [`ProvisionOutcome::RolledBack`].
    pub async fn provision(
        &self,
        ctx: &mut ProvisioningContext,
        spec: &LaunchSpec,
    ) -> Result<ProvisionOutcome, Error> {
        let instance = self.launch(ctx, spec).await?;
        let Some(instance) = instance else {
            ctx.messages.warn("no instance was launched");
            return Ok(ProvisionOutcome::NoInstance);
        };

        // Record the id before any waiting, so a timeout mid-boot still has
        // something to roll back.
        ctx.machine.set_instance_id(&instance.id);
        info!(self.log, "instance launched";
            "machine_id" => %ctx.machine.id,
            "instance_id" => &instance.id);
        ctx.messages.info(&format!("launched instance {}", instance.id));

        ctx.messages.info("waiting for instance to become ready...");
        let timeout = Duration::from_secs(spec.instance_ready_timeout);
        let start = Instant::now();
        let outcome = readiness::wait_for_instance_ready(
            &self.log,
            &*ctx.client,
            &instance.id,
            &ctx.interrupt,
            self.config.instance_check_interval(),
            timeout,
        )
        .await;
        ctx.metrics.record(METRIC_INSTANCE_READY, start.elapsed());
        match outcome? {
            WaitOutcome::Ready | WaitOutcome::Interrupted => {}
            WaitOutcome::TimedOut => {
                ctx.messages.warn(
                    "instance failed to become ready in time; terminating",
                );
                rollback::terminate(&self.log, ctx).await?;
                return Err(Error::InstanceReadyTimeout {
                    timeout_secs: spec.instance_ready_timeout,
                });
            }
        }

        ctx.messages.info("waiting for remote access...");
        let start = Instant::now();
        let outcome = readiness::wait_for_remote_access(
            &self.log,
            &*ctx.remote,
            &instance.id,
            &ctx.interrupt,
            self.config.remote_check_interval(),
        )
        .await;
        ctx.metrics.record(METRIC_REMOTE_ACCESS_READY, start.elapsed());
        if outcome == WaitOutcome::Interrupted {
            ctx.messages.warn("interrupted; terminating instance");
            rollback::terminate(&self.log, ctx).await?;
            return Ok(ProvisionOutcome::RolledBack);
        }

        ctx.messages.info("machine is ready");
        Ok(ProvisionOutcome::Provisioned(instance))
    }

    /// Dispatch to on-demand or spot allocation per the spec's spot flag.
    async fn launch(
        &self,
        ctx: &ProvisioningContext,
        spec: &LaunchSpec,
    ) -> Result<Option<Instance>, Error> {
        if spec.spot {
            let poller =
                SpotRequestPoller::new(&self.log, &*ctx.client, &self.config);
            poller.resolve(spec, &*ctx.messages, &ctx.interrupt).await
        } else {
            let options = spec.launch_options();
            match ctx.client.create_instance(&options).await {
                Ok(instance) => Ok(Some(instance)),
                Err(err) => Err(Error::classify_create(
                    err,
                    spec.subnet_id.as_deref(),
                )),
            }
        }
    }
}
