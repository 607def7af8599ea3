// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drives a spot bid from submission to a resolved instance.
//!
//! The loop sleeps a fixed interval, honors the interrupt flag between
//! iterations, and classifies each observed state: `active` ends the loop
//! successfully, `closed`/`cancelled`/`failed` end it unsuccessfully, and
//! everything else (including states this crate does not recognize) keeps
//! polling, bounded only by the optional iteration cap in [`Config`].
//! Whatever ends the loop, the request is always cancelled afterwards.

use slog::{info, o, warn, Logger};
use tokio::time::sleep;

use crate::client::{
    CloudComputeClient, Instance, SpotRequestResponse, SpotRequestState,
};
use crate::config::Config;
use crate::context::{InterruptFlag, MessageSink};
use crate::error::Error;
use crate::spec::LaunchSpec;

pub struct SpotRequestPoller<'a> {
    log: Logger,
    client: &'a dyn CloudComputeClient,
    config: &'a Config,
}

/// Why the poll loop stopped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LoopEnd {
    Fulfilled,
    Terminal,
    Interrupted,
    CapExceeded,
}

impl<'a> SpotRequestPoller<'a> {
    pub fn new(
        log: &Logger,
        client: &'a dyn CloudComputeClient,
        config: &'a Config,
    ) -> SpotRequestPoller<'a> {
        SpotRequestPoller {
            log: log.new(o!("component" => "SpotRequestPoller")),
            client,
            config,
        }
    }

    /// Submit the bid described by `spec` and poll it to a conclusion.
    ///
    /// Returns the fulfilled instance when the final observation carries an
    /// instance id, and `None` otherwise; a request that ends in a fault
    /// state is not an error at this layer.
    pub async fn resolve(
        &self,
        spec: &LaunchSpec,
        messages: &dyn MessageSink,
        interrupt: &InterruptFlag,
    ) -> Result<Option<Instance>, Error> {
        let mut last = self
            .client
            .request_spot_instances(
                &spec.image_id,
                &spec.instance_type,
                spec.spot_max_price.as_deref(),
                &spec.spot_options(),
            )
            .await
            .map_err(Error::from_client)?;
        info!(self.log, "spot request submitted";
            "request_id" => &last.id,
            "state" => %last.state);
        messages.info(&format!("spot request submitted: {}", last.id));

        let end = self.poll_loop(&mut last, messages, interrupt).await;

        // Unconditional cleanup: the request is cancelled no matter how the
        // loop ended. A failed cancel is logged rather than masking the
        // loop's own outcome.
        if let Err(err) = self.client.cancel_spot_request(&last.id).await {
            warn!(self.log, "failed to cancel spot request";
                "request_id" => &last.id,
                "error" => %err);
        }
        let end = end?;

        match &last.instance_id {
            Some(instance_id) => {
                let instance = self
                    .client
                    .get_instance(instance_id)
                    .await
                    .map_err(Error::from_client)?;
                Ok(Some(instance))
            }
            None => {
                if end == LoopEnd::Terminal {
                    messages.warn(&format!(
                        "spot request {} ended in state \"{}\" without an \
                         instance{}",
                        last.id,
                        last.state,
                        fault_suffix(&last.fault),
                    ));
                }
                Ok(None)
            }
        }
    }

    async fn poll_loop(
        &self,
        last: &mut SpotRequestResponse,
        messages: &dyn MessageSink,
        interrupt: &InterruptFlag,
    ) -> Result<LoopEnd, Error> {
        let mut iterations: u32 = 0;
        loop {
            sleep(self.config.spot_poll_interval()).await;
            if interrupt.is_set() {
                info!(self.log, "spot poll interrupted";
                    "request_id" => &last.id);
                return Ok(LoopEnd::Interrupted);
            }
            iterations += 1;
            if let Some(cap) = self.config.spot_poll_max_iterations {
                if iterations > cap.get() {
                    warn!(self.log, "spot poll iteration cap exceeded";
                        "request_id" => &last.id,
                        "cap" => cap.get());
                    return Ok(LoopEnd::CapExceeded);
                }
            }

            let current = match self
                .client
                .describe_spot_request(&last.id)
                .await
            {
                Ok(Some(current)) => current,
                // A momentarily empty description is not an error.
                Ok(None) => continue,
                Err(err) if err.retryable() => continue,
                Err(err) => return Err(Error::from_client(err)),
            };

            if current.state != last.state {
                info!(self.log, "spot request changed state";
                    "request_id" => &current.id,
                    "state" => %current.state);
                messages.info(&format!(
                    "spot request status: {}{}",
                    current.state,
                    fault_suffix(&current.fault),
                ));
            }
            let state = current.state;
            *last = current;

            match state {
                SpotRequestState::Active => return Ok(LoopEnd::Fulfilled),
                SpotRequestState::Closed
                | SpotRequestState::Cancelled
                | SpotRequestState::Failed => return Ok(LoopEnd::Terminal),
                SpotRequestState::NotCreated
                | SpotRequestState::Open
                | SpotRequestState::Unknown => {}
            }
        }
    }
}

fn fault_suffix(fault: &Option<String>) -> String {
    match fault {
        Some(fault) => format!(" ({fault})"),
        None => String::new(),
    }
}
