use crate::client::{ApiError, ApiResponse};
use crate::report::{ScenarioOutcome, TierReport};
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::{self, Debug};
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};
use validators::Violation;

/// Why a single scenario failed. None of these stop sibling scenarios.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Assertion failed: {message}")]
    Assertion { message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] ApiError),

    #[error("Scenario panicked: {message}")]
    Panicked { message: String },
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// Test tiers selectable from the command line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Validator checks, no network
    Unit,
    /// Contract checks against the running service
    Integration,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Unit => write!(f, "unit"),
            Tier::Integration => write!(f, "integration"),
        }
    }
}

/// One named check run against a context `C`.
#[async_trait]
pub trait Scenario<C: Sync>: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self, ctx: &C) -> ScenarioResult<()>;
}

/// Ordered list of scenarios for one tier.
pub struct ScenarioRegistry<C: Sync> {
    scenarios: Vec<Box<dyn Scenario<C>>>,
}

impl<C: Sync> ScenarioRegistry<C> {
    pub fn new() -> Self {
        Self {
            scenarios: Vec::new(),
        }
    }

    pub fn register(&mut self, scenario: Box<dyn Scenario<C>>) {
        self.scenarios.push(scenario);
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.name()).collect()
    }

    /// Run every scenario in registration order. A failing or panicking
    /// scenario is recorded and the next one still runs.
    pub async fn run_all(&self, tier: Tier, ctx: &C) -> TierReport {
        let mut outcomes = Vec::with_capacity(self.scenarios.len());

        for scenario in &self.scenarios {
            let started = Instant::now();
            let result = AssertUnwindSafe(scenario.run(ctx))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(ScenarioError::Panicked {
                        message: panic_message(panic.as_ref()),
                    })
                });
            let elapsed = started.elapsed();

            match &result {
                Ok(()) => info!("[{}] {} passed in {:?}", tier, scenario.name(), elapsed),
                Err(e) => error!("[{}] {} failed: {}", tier, scenario.name(), e),
            }
            outcomes.push(ScenarioOutcome::from_result(scenario.name(), elapsed, result));
        }

        TierReport::completed(tier, outcomes)
    }
}

impl<C: Sync> Default for ScenarioRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapts a plain function into a context-free scenario.
pub struct Check {
    name: &'static str,
    check: fn() -> ScenarioResult<()>,
}

impl Check {
    pub fn new(name: &'static str, check: fn() -> ScenarioResult<()>) -> Self {
        Self { name, check }
    }
}

#[async_trait]
impl Scenario<()> for Check {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, _ctx: &()) -> ScenarioResult<()> {
        (self.check)()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

pub fn fail<T>(message: impl Into<String>) -> ScenarioResult<T> {
    Err(ScenarioError::Assertion {
        message: message.into(),
    })
}

/// Fail with a lazily built message unless `condition` holds.
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> ScenarioResult<()> {
    if condition {
        Ok(())
    } else {
        fail(message())
    }
}

pub fn ensure_eq<T: PartialEq + Debug + ?Sized>(
    label: &str,
    expected: &T,
    actual: &T,
) -> ScenarioResult<()> {
    ensure(expected == actual, || {
        format!("{label}: expected {expected:?}, got {actual:?}")
    })
}

/// The response status must be one of `accepted`.
pub fn ensure_status(
    response: &ApiResponse,
    accepted: &[u16],
    action: &str,
) -> ScenarioResult<()> {
    ensure(accepted.contains(&response.status_code()), || {
        format!(
            "{action}: expected status in {accepted:?}, got {} - {}",
            response.status, response.body
        )
    })
}

pub fn ensure_valid(label: &str, violations: Vec<Violation>) -> ScenarioResult<()> {
    ensure(violations.is_empty(), || {
        let details: Vec<String> = violations.iter().map(ToString::to_string).collect();
        format!("{label}: {}", details.join("; "))
    })
}
