// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use slog::{o, Logger};

use crate::client::{
    ClientError, CloudComputeClient, Instance, MachineState,
    RemoteAccessProbe, SpotRequestResponse,
};
use crate::context::{
    ActionRunner, InterruptFlag, MachineRecord, MessageSink,
    ProvisioningContext, RunFlags,
};
use crate::metrics::Metrics;
use crate::spec::{LaunchOptions, SpotOptions};

pub fn log() -> Logger {
    Logger::root(slog::Discard, o!())
}

/// Scripted compute client. Unscripted calls get benign defaults: creates
/// succeed with instance `i-1`, ready checks report not-ready, and the
/// machine state is not-created.
#[derive(Default)]
pub struct MockClient {
    create_error: Mutex<Option<ClientError>>,
    pub create_calls: AtomicU32,
    spot_submit: Mutex<Option<SpotRequestResponse>>,
    describes: Mutex<VecDeque<Option<SpotRequestResponse>>>,
    describe_fallback: Mutex<Option<Option<SpotRequestResponse>>>,
    pub describe_calls: AtomicU32,
    pub cancel_calls: AtomicU32,
    /// Check number on which `instance_ready` first reports true;
    /// zero means never.
    pub ready_after: AtomicU32,
    pub ready_calls: AtomicU32,
    machine_state: Mutex<Option<MachineState>>,
}

impl MockClient {
    pub fn fail_create(&self, err: ClientError) {
        *self.create_error.lock().unwrap() = Some(err);
    }

    /// Script the spot path: the submission response, then one entry per
    /// describe call. Once the script runs out, the last entry repeats.
    pub fn script_spot(
        &self,
        submit: SpotRequestResponse,
        describes: Vec<Option<SpotRequestResponse>>,
    ) {
        *self.spot_submit.lock().unwrap() = Some(submit);
        *self.describes.lock().unwrap() = describes.into_iter().collect();
    }

    pub fn set_machine_state(&self, state: MachineState) {
        *self.machine_state.lock().unwrap() = Some(state);
    }
}

#[async_trait]
impl CloudComputeClient for MockClient {
    async fn create_instance(
        &self,
        _options: &LaunchOptions,
    ) -> Result<Instance, ClientError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.create_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(Instance { id: "i-1".to_string() })
    }

    async fn request_spot_instances(
        &self,
        _image_id: &str,
        _instance_type: &str,
        _max_price: Option<&str>,
        _options: &SpotOptions,
    ) -> Result<SpotRequestResponse, ClientError> {
        self.spot_submit
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ClientError::Api {
                message: "no spot submission scripted".to_string(),
            })
    }

    async fn describe_spot_request(
        &self,
        _id: &str,
    ) -> Result<Option<SpotRequestResponse>, ClientError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.describes.lock().unwrap();
        match queue.pop_front() {
            Some(observation) => {
                if queue.is_empty() {
                    *self.describe_fallback.lock().unwrap() =
                        Some(observation.clone());
                }
                Ok(observation)
            }
            None => Ok(self
                .describe_fallback
                .lock()
                .unwrap()
                .clone()
                .unwrap_or(None)),
        }
    }

    async fn cancel_spot_request(
        &self,
        _id: &str,
    ) -> Result<(), ClientError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_instance(&self, id: &str) -> Result<Instance, ClientError> {
        Ok(Instance { id: id.to_string() })
    }

    async fn instance_ready(&self, _id: &str) -> Result<bool, ClientError> {
        let check = self.ready_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let after = self.ready_after.load(Ordering::SeqCst);
        Ok(after != 0 && check >= after)
    }

    async fn machine_state(
        &self,
        instance_id: Option<&str>,
    ) -> Result<MachineState, ClientError> {
        match *self.machine_state.lock().unwrap() {
            Some(state) => Ok(state),
            None if instance_id.is_some() => Ok(MachineState::Pending),
            None => Ok(MachineState::NotCreated),
        }
    }
}

/// Remote-access probe that becomes reachable on a scripted check number.
#[derive(Default)]
pub struct MockProbe {
    after: AtomicU32,
    pub calls: AtomicU32,
}

impl MockProbe {
    pub fn ready_after(after: u32) -> MockProbe {
        let probe = MockProbe::default();
        probe.set_ready_after(after);
        probe
    }

    pub fn never() -> MockProbe {
        MockProbe::default()
    }

    pub fn set_ready_after(&self, after: u32) {
        self.after.store(after, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteAccessProbe for MockProbe {
    async fn remote_ready(&self, _instance_id: &str) -> bool {
        let check = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let after = self.after.load(Ordering::SeqCst);
        after != 0 && check >= after
    }
}

/// Message sink that collects everything for assertion.
#[derive(Default)]
pub struct CollectedMessages {
    infos: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
}

impl CollectedMessages {
    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl MessageSink for CollectedMessages {
    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}

/// Action runner that records what the destroy workflow was handed.
#[derive(Default)]
pub struct MockActions {
    pub destroy_calls: AtomicU32,
    pub last_flags: Mutex<Option<RunFlags>>,
    pub last_interrupt_set: AtomicBool,
}

#[async_trait]
impl ActionRunner for MockActions {
    async fn run_destroy(
        &self,
        ctx: &ProvisioningContext,
    ) -> Result<(), anyhow::Error> {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_flags.lock().unwrap() = Some(ctx.flags);
        self.last_interrupt_set
            .store(ctx.interrupt.is_set(), Ordering::SeqCst);
        Ok(())
    }
}

/// A context wired to fresh mocks, plus direct handles to those mocks.
pub struct Harness {
    pub ctx: ProvisioningContext,
    pub client: Arc<MockClient>,
    pub probe: Arc<MockProbe>,
    pub actions: Arc<MockActions>,
    pub messages: Arc<CollectedMessages>,
}

pub fn harness() -> Harness {
    let client = Arc::new(MockClient::default());
    let probe = Arc::new(MockProbe::default());
    let actions = Arc::new(MockActions::default());
    let messages = Arc::new(CollectedMessages::default());
    let ctx = ProvisioningContext {
        machine: MachineRecord::new("test-machine"),
        metrics: Metrics::default(),
        messages: messages.clone(),
        interrupt: InterruptFlag::default(),
        flags: RunFlags::default(),
        client: client.clone(),
        remote: probe.clone(),
        actions: actions.clone(),
    };
    Harness { ctx, client, probe, actions, messages }
}
