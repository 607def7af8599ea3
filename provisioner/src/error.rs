// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Errors surfaced by a provisioning run.

use crate::client::ClientError;

/// An error produced while launching an instance or waiting for it to become
/// ready.
///
/// Readiness timeouts are only surfaced after the partially-provisioned
/// instance has been rolled back, so a reported [`Error::InstanceReadyTimeout`]
/// never leaves an instance running. External interruption is not an error at
/// all; interrupted runs complete with [`crate::ProvisionOutcome::RolledBack`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured subnet does not exist in the target region.
    #[error("subnet not found: {subnet_id}")]
    SubnetNotFound { subnet_id: String },

    /// Any other failure reported by the compute provider, carrying the
    /// provider's original message.
    #[error("provider error: {message}")]
    Provider { message: String },

    /// The instance never reported ready within the configured budget.
    #[error("instance did not become ready within {timeout_secs} seconds")]
    InstanceReadyTimeout { timeout_secs: u64 },

    /// A failure that originated outside the provider API surface; passed
    /// through unmodified.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl Error {
    /// Translate a client error without any launch-time classification.
    pub(crate) fn from_client(err: ClientError) -> Error {
        match err {
            ClientError::NotFound { message }
            | ClientError::Api { message } => Error::Provider { message },
            ClientError::Other(err) => Error::Unexpected(err),
        }
    }

    /// Classify a failure from the create-instance call.
    ///
    /// A provider "not found" whose message references the configured subnet
    /// becomes [`Error::SubnetNotFound`]. Matching on the message text is a
    /// documented fallback: the provider does not expose a structured
    /// invalid-subnet code through the client surface we consume.
    pub(crate) fn classify_create(
        err: ClientError,
        subnet_id: Option<&str>,
    ) -> Error {
        match (err, subnet_id) {
            (ClientError::NotFound { message }, Some(subnet))
                if message.contains(subnet) =>
            {
                Error::SubnetNotFound { subnet_id: subnet.to_string() }
            }
            (err, _) => Error::from_client(err),
        }
    }
}
