// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The compute-provider surface this crate consumes.
//!
//! The provider API itself lives in the host pipeline; this module only
//! defines the contracts the orchestration needs. On-demand and spot
//! allocation go through the same [`CloudComputeClient`], selected by the
//! launch spec's spot flag.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::spec::{LaunchOptions, SpotOptions};

/// An error reported by the compute provider.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The provider could not find an object named in the request.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Any other provider-level failure.
    #[error("provider request failed: {message}")]
    Api { message: String },

    /// A failure below the provider API (transport, SDK). Propagates
    /// unmodified.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    /// Whether a readiness check that failed with this error may be retried.
    ///
    /// A freshly-launched instance can be briefly invisible to describe
    /// calls, so "not found" is part of the retriable set; everything else
    /// fails the wait permanently.
    pub fn retryable(&self) -> bool {
        match self {
            ClientError::NotFound { .. } => true,
            ClientError::Api { .. } | ClientError::Other(_) => false,
        }
    }
}

/// A provider-assigned instance handle.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Instance {
    pub id: String,
}

/// Provider-side state of a spot request, as read from repeated describes.
///
/// Transitions are not assumed monotonic; the poller only acts on the
/// states below and treats anything it does not recognize as non-terminal.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum SpotRequestState {
    NotCreated,
    Open,
    Active,
    Closed,
    Cancelled,
    Failed,
    #[serde(other)]
    Unknown,
}

impl SpotRequestState {
    /// Terminal states end the poll loop; everything else keeps polling.
    pub fn is_terminal(&self) -> bool {
        match self {
            SpotRequestState::Active
            | SpotRequestState::Closed
            | SpotRequestState::Cancelled
            | SpotRequestState::Failed => true,
            SpotRequestState::NotCreated
            | SpotRequestState::Open
            | SpotRequestState::Unknown => false,
        }
    }
}

impl fmt::Display for SpotRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpotRequestState::NotCreated => "not-created",
            SpotRequestState::Open => "open",
            SpotRequestState::Active => "active",
            SpotRequestState::Closed => "closed",
            SpotRequestState::Cancelled => "cancelled",
            SpotRequestState::Failed => "failed",
            SpotRequestState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One observation of a spot request.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SpotRequestResponse {
    pub id: String,
    pub state: SpotRequestState,
    /// Provider-reported reason when the request is in a fault state.
    pub fault: Option<String>,
    /// Set once the request has been fulfilled.
    pub instance_id: Option<String>,
}

/// Provider-reported lifecycle state of the machine record, used by the
/// recovery path to decide whether anything exists to roll back.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MachineState {
    NotCreated,
    Pending,
    Running,
    Stopped,
    Terminated,
}

/// The compute API consumed by the orchestration.
#[async_trait]
pub trait CloudComputeClient: Send + Sync {
    /// Create an on-demand instance. Must report a [`ClientError::NotFound`]
    /// for ids (subnets in particular) that do not exist.
    async fn create_instance(
        &self,
        options: &LaunchOptions,
    ) -> Result<Instance, ClientError>;

    /// Submit a spot bid, returning the new request's id and initial state.
    async fn request_spot_instances(
        &self,
        image_id: &str,
        instance_type: &str,
        max_price: Option<&str>,
        options: &SpotOptions,
    ) -> Result<SpotRequestResponse, ClientError>;

    /// Re-describe a spot request by id. A `None` return is a momentarily
    /// empty description, not an error.
    async fn describe_spot_request(
        &self,
        id: &str,
    ) -> Result<Option<SpotRequestResponse>, ClientError>;

    /// Cancel a spot request. Safe to call regardless of request state.
    async fn cancel_spot_request(&self, id: &str) -> Result<(), ClientError>;

    /// Fetch the handle for a known instance id.
    async fn get_instance(&self, id: &str) -> Result<Instance, ClientError>;

    /// Provider-side boot completion for an instance.
    async fn instance_ready(&self, id: &str) -> Result<bool, ClientError>;

    /// Lifecycle state of the machine record's instance, if any.
    async fn machine_state(
        &self,
        instance_id: Option<&str>,
    ) -> Result<MachineState, ClientError>;
}

/// Shell/management-plane reachability for a booted instance.
#[async_trait]
pub trait RemoteAccessProbe: Send + Sync {
    async fn remote_ready(&self, instance_id: &str) -> bool;
}
