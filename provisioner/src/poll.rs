// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded retry-until-timeout.
//!
//! The attempt budget is count-based rather than wall-clock based: the
//! condition is invoked at most `max_attempts` times with a fixed pause
//! between attempts, so real elapsed time can exceed
//! `max_attempts * poll_interval` by the duration of the checks themselves.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Result of one condition check.
pub enum CondCheckError<E> {
    /// Not satisfied yet; check again after the pause.
    NotYet,
    /// Failed permanently; stop retrying.
    Failed(E),
}

#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    #[error("condition not met after {attempts} attempts")]
    TimedOut { attempts: u32 },
    #[error("permanent failure while waiting: {0}")]
    Permanent(E),
}

/// Invoke `cond` at most `max_attempts` times, pausing `poll_interval`
/// between attempts, until it succeeds or fails permanently.
pub async fn wait_for_condition<T, E, Func, Fut>(
    mut cond: Func,
    poll_interval: Duration,
    max_attempts: u32,
) -> Result<T, Error<E>>
where
    E: std::fmt::Display,
    Func: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CondCheckError<E>>>,
{
    let mut attempts = 0;
    while attempts < max_attempts {
        attempts += 1;
        match cond().await {
            Ok(value) => return Ok(value),
            Err(CondCheckError::Failed(err)) => {
                return Err(Error::Permanent(err));
            }
            Err(CondCheckError::NotYet) => {}
        }
        if attempts < max_attempts {
            sleep(poll_interval).await;
        }
    }
    Err(Error::TimedOut { attempts })
}
