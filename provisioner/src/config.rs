// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polling configuration for a provisioning run.

use std::num::NonZeroU32;
use std::time::Duration;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunables for the poll loops. All intervals are in milliseconds.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Pause between spot-request describes.
    #[serde(default = "default_spot_poll_interval")]
    pub spot_poll_interval_millis: u64,
    /// Pause between instance-ready checks. Together with the launch spec's
    /// `instance_ready_timeout` this determines the attempt budget.
    #[serde(default = "default_check_interval")]
    pub instance_check_interval_millis: u64,
    /// Pause between remote-access checks.
    #[serde(default = "default_check_interval")]
    pub remote_check_interval_millis: u64,
    /// Safety cap on spot poll iterations. Unset preserves the historical
    /// behavior of polling a request that never reaches a recognized
    /// terminal state forever.
    #[serde(default)]
    pub spot_poll_max_iterations: Option<NonZeroU32>,
}

fn default_spot_poll_interval() -> u64 {
    5000
}

fn default_check_interval() -> u64 {
    2000
}

impl Default for Config {
    fn default() -> Config {
        Config {
            spot_poll_interval_millis: default_spot_poll_interval(),
            instance_check_interval_millis: default_check_interval(),
            remote_check_interval_millis: default_check_interval(),
            spot_poll_max_iterations: None,
        }
    }
}

impl Config {
    /// Load a `Config` from the given TOML file.
    pub fn from_file(path: &Utf8Path) -> Result<Config, LoadError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|err| LoadError::Io { path: path.into(), err })?;
        let config = toml::from_str(&contents)
            .map_err(|err| LoadError::Parse { path: path.into(), err })?;
        Ok(config)
    }

    pub fn spot_poll_interval(&self) -> Duration {
        Duration::from_millis(self.spot_poll_interval_millis)
    }

    pub fn instance_check_interval(&self) -> Duration {
        Duration::from_millis(self.instance_check_interval_millis)
    }

    pub fn remote_check_interval(&self) -> Duration {
        Duration::from_millis(self.remote_check_interval_millis)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to parse {path} as TOML")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        err: toml::de::Error,
    },
}
