// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The readiness gate: two sequential waits between launch and hand-off.
//!
//! Phase A waits for provider-reported boot completion under an attempt
//! budget derived from the configured timeout. Phase B waits for remote
//! reachability with no timeout of its own; only predicate success or
//! interruption ends it. Neither phase unwinds on timeout or interruption;
//! the caller branches on the returned [`WaitOutcome`] and decides whether
//! to roll back.

use std::time::Duration;

use slog::{debug, info, Logger};
use tokio::time::sleep;

use crate::client::{CloudComputeClient, RemoteAccessProbe};
use crate::context::InterruptFlag;
use crate::error::Error;
use crate::poll::{self, CondCheckError};

/// How a wait phase ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
    Interrupted,
}

/// Number of ready checks allowed within `timeout` at one check per
/// `interval`.
pub fn attempt_budget(timeout: Duration, interval: Duration) -> u32 {
    let interval = interval.as_millis().max(1);
    (timeout.as_millis() / interval).max(1) as u32
}

/// Phase A: wait for the provider to report the instance ready.
///
/// Interruption short-circuits the wait on the next check without being
/// treated as a failure. Retryable client errors (an instance briefly
/// invisible to describes) count as "not ready yet" against the same
/// budget; anything else ends the wait with an error.
pub async fn wait_for_instance_ready(
    log: &Logger,
    client: &dyn CloudComputeClient,
    instance_id: &str,
    interrupt: &InterruptFlag,
    check_interval: Duration,
    timeout: Duration,
) -> Result<WaitOutcome, Error> {
    let max_attempts = attempt_budget(timeout, check_interval);
    debug!(log, "waiting for instance to become ready";
        "instance_id" => instance_id,
        "max_attempts" => max_attempts);

    let result = poll::wait_for_condition(
        || {
            let flag = interrupt;
            let compute = client;
            async move {
                if flag.is_set() {
                    return Ok(WaitOutcome::Interrupted);
                }
                match compute.instance_ready(instance_id).await {
                    Ok(true) => Ok(WaitOutcome::Ready),
                    Ok(false) => Err(CondCheckError::NotYet),
                    Err(err) if err.retryable() => Err(CondCheckError::NotYet),
                    Err(err) => Err(CondCheckError::Failed(err)),
                }
            }
        },
        check_interval,
        max_attempts,
    )
    .await;

    match result {
        Ok(outcome) => {
            info!(log, "instance ready wait finished";
                "instance_id" => instance_id,
                "outcome" => ?outcome);
            Ok(outcome)
        }
        Err(poll::Error::TimedOut { attempts }) => {
            info!(log, "instance did not become ready";
                "instance_id" => instance_id,
                "attempts" => attempts);
            Ok(WaitOutcome::TimedOut)
        }
        Err(poll::Error::Permanent(err)) => Err(Error::from_client(err)),
    }
}

/// Phase B: wait for remote access, unbounded.
///
/// Exits as soon as the probe reports reachable or the interrupt flag is
/// set; the flag is consulted before every check.
pub async fn wait_for_remote_access(
    log: &Logger,
    probe: &dyn RemoteAccessProbe,
    instance_id: &str,
    interrupt: &InterruptFlag,
    check_interval: Duration,
) -> WaitOutcome {
    debug!(log, "waiting for remote access"; "instance_id" => instance_id);
    loop {
        if interrupt.is_set() {
            info!(log, "remote access wait interrupted";
                "instance_id" => instance_id);
            return WaitOutcome::Interrupted;
        }
        if probe.remote_ready(instance_id).await {
            info!(log, "remote access ready"; "instance_id" => instance_id);
            return WaitOutcome::Ready;
        }
        sleep(check_interval).await;
    }
}
