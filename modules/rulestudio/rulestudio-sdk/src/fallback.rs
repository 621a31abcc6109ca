//! Ordered strategy chains.
//!
//! Several operations have more than one way to get an answer from the
//! engine, depending on what the engine version supports. A chain tries the
//! strategies in order, records what happened to each one, and stops at the
//! first success.

use std::fmt::Debug;
use std::future::Future;

use serde::Serialize;
use tracing::debug;

use crate::error::{ClientError, Result};

/// What happened to one strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    Failed(String),
}

/// One strategy tried by a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt<S> {
    pub strategy: S,
    pub outcome: AttemptOutcome,
}

/// Result of running a chain.
#[derive(Debug)]
pub struct FallbackResult<S, T> {
    /// Every attempt made, in order
    pub attempts: Vec<Attempt<S>>,
    /// Winning strategy and its value, or the last error
    pub outcome: Result<(S, T)>,
}

impl<S, T> FallbackResult<S, T> {
    /// Strategy that produced the value, if any.
    #[must_use]
    pub fn winner(&self) -> Option<&S> {
        self.outcome.as_ref().ok().map(|(s, _)| s)
    }

    /// Drop the attempt log.
    ///
    /// # Errors
    /// Returns the last strategy's error when every strategy failed.
    pub fn into_value(self) -> Result<T> {
        self.outcome.map(|(_, v)| v)
    }
}

/// Try `strategies` in order until one succeeds.
pub async fn run_chain<S, T, F, Fut>(strategies: &[S], mut attempt: F) -> FallbackResult<S, T>
where
    S: Copy + Debug,
    F: FnMut(S) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts = Vec::with_capacity(strategies.len());
    let mut last_error = ClientError::Config("no strategies configured".into());

    for &strategy in strategies {
        match attempt(strategy).await {
            Ok(value) => {
                debug!(strategy = ?strategy, "Strategy succeeded");
                attempts.push(Attempt {
                    strategy,
                    outcome: AttemptOutcome::Succeeded,
                });
                return FallbackResult {
                    attempts,
                    outcome: Ok((strategy, value)),
                };
            }
            Err(e) => {
                debug!(strategy = ?strategy, error = %e, "Strategy failed, trying next");
                attempts.push(Attempt {
                    strategy,
                    outcome: AttemptOutcome::Failed(e.to_string()),
                });
                last_error = e;
            }
        }
    }

    FallbackResult {
        attempts,
        outcome: Err(last_error),
    }
}
