// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Compensating action: terminate a partially or fully provisioned
//! instance via the host pipeline's destroy workflow.

use slog::{info, Logger};

use crate::client::MachineState;
use crate::context::ProvisioningContext;
use crate::error::Error;

/// Invoke the destroy workflow synchronously with a sanitized copy of the
/// context (see [`ProvisioningContext::sanitized_for_destroy`]).
///
/// Failures from the destroy workflow propagate unmodified; there is no
/// retry here. Calling this twice issues two independent destroy
/// invocations; rollback is not idempotent.
pub async fn terminate(
    log: &Logger,
    ctx: &ProvisioningContext,
) -> Result<(), anyhow::Error> {
    info!(log, "terminating instance";
        "machine_id" => %ctx.machine.id,
        "instance_id" => ?ctx.machine.instance_id);
    let destroy_ctx = ctx.sanitized_for_destroy();
    ctx.actions.run_destroy(&destroy_ctx).await
}

/// Second line of defense, invoked by the host pipeline after any unhandled
/// error downstream of this stage.
///
/// Errors this crate already classified were handled by its own rollback
/// paths, so they are ignored here. For anything else, terminate whenever
/// the provider reports that something was actually created.
pub async fn recover(
    log: &Logger,
    ctx: &ProvisioningContext,
    error: &anyhow::Error,
) -> Result<(), anyhow::Error> {
    if error.downcast_ref::<Error>().is_some() {
        return Ok(());
    }
    let state = ctx
        .client
        .machine_state(ctx.machine.instance_id.as_deref())
        .await?;
    if state != MachineState::NotCreated {
        info!(log, "recovering from downstream error";
            "machine_id" => %ctx.machine.id,
            "machine_state" => ?state);
        terminate(log, ctx).await?;
    }
    Ok(())
}
