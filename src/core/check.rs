use crate::error::ProbeError;
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

pub const SUCCESS_MESSAGE: &str = "check passed";
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Why a check failed, normalized to one of three shapes.
#[derive(Debug)]
pub enum FailureCause {
    /// A typed error carrying its own message.
    Structured(ProbeError),
    /// A bare message, e.g. an assertion the check made about a response.
    Message(String),
    /// Anything that carries no readable text.
    Unknown,
}

impl FailureCause {
    pub fn message(&self) -> String {
        match self {
            Self::Structured(e) => e.to_string(),
            Self::Message(m) => m.clone(),
            Self::Unknown => UNKNOWN_ERROR.to_string(),
        }
    }

    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        if let Some(s) = payload.downcast_ref::<&'static str>() {
            Self::Message((*s).to_string())
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Self::Message(s.clone())
        } else {
            Self::Unknown
        }
    }
}

impl From<ProbeError> for FailureCause {
    fn from(e: ProbeError) -> Self {
        Self::Structured(e)
    }
}

impl From<String> for FailureCause {
    fn from(m: String) -> Self {
        Self::Message(m)
    }
}

impl From<&str> for FailureCause {
    fn from(m: &str) -> Self {
        Self::Message(m.to_string())
    }
}

/// Outcome of one check. Built once when the check settles, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub message: String,
    /// Wall-clock milliseconds, including the whole await.
    pub duration: f64,
}

/// Runs `check` and turns whatever happens into a [`TestResult`].
///
/// Errors and panics inside the check are captured, logged and reported as a failed
/// result; this function itself never fails.
pub async fn run_check<F, Fut>(name: &str, check: F) -> TestResult
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), FailureCause>>,
{
    let started = Instant::now();
    let outcome = AssertUnwindSafe(async move { check().await })
        .catch_unwind()
        .await;
    let duration = started.elapsed().as_secs_f64() * 1000.0;

    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(cause)) => Some(cause),
        Err(payload) => Some(FailureCause::from_panic(payload)),
    };

    match failure {
        None => TestResult {
            name: name.to_string(),
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            duration,
        },
        Some(cause) => {
            let message = cause.message();
            log::error!("[check: {name}] {message}");
            TestResult { name: name.to_string(), success: false, message, duration }
        }
    }
}
