// Transform chain runner
//
// Runs an ordered list of text -> text functions, threading each output into
// the next input. A function that errors or panics is logged and skipped;
// the running text is left as it was before that step.

use crate::types::{StageFailure, StageKind};
use anyhow::{anyhow, Result};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::OnceLock;
use std::thread;
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, warn};

/// Normalizes what a transform returns into the text that continues down
/// the chain. An absent value becomes the empty string.
pub trait IntoTransformOutput {
    fn into_output(self) -> Result<String>;
}

impl IntoTransformOutput for String {
    fn into_output(self) -> Result<String> {
        Ok(self)
    }
}

impl IntoTransformOutput for Option<String> {
    fn into_output(self) -> Result<String> {
        Ok(self.unwrap_or_default())
    }
}

impl IntoTransformOutput for Result<String> {
    fn into_output(self) -> Result<String> {
        self
    }
}

impl IntoTransformOutput for Result<Option<String>> {
    fn into_output(self) -> Result<String> {
        self.map(Option::unwrap_or_default)
    }
}

type BoxedFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;
type ImmediateFn = dyn Fn(&str) -> Result<String> + Send + Sync;
type SuspendingFn = dyn Fn(String) -> BoxedFuture + Send + Sync;

enum TransformKind {
    Immediate(Box<ImmediateFn>),
    Suspending(Box<SuspendingFn>),
}

/// A named text -> text capability supplied to the pipeline by its caller.
pub struct Transform {
    name: String,
    description: String,
    kind: TransformKind,
}

impl Transform {
    /// Wrap a function that returns its result directly
    pub fn immediate<F, R>(name: &str, func: F) -> Self
    where
        F: Fn(&str) -> R + Send + Sync + 'static,
        R: IntoTransformOutput,
    {
        Self {
            name: name.to_string(),
            description: String::new(),
            kind: TransformKind::Immediate(Box::new(move |text: &str| func(text).into_output())),
        }
    }

    /// Wrap a function that returns a future. The runner drives it to
    /// completion before the next transform starts.
    pub fn suspending<F, Fut, R>(name: &str, func: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoTransformOutput + 'static,
    {
        Self {
            name: name.to_string(),
            description: String::new(),
            kind: TransformKind::Suspending(Box::new(move |text: String| -> BoxedFuture {
                let fut = func(text);
                Box::pin(async move { fut.await.into_output() })
            })),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self.kind, TransformKind::Suspending(_))
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("name", &self.name)
            .field("suspending", &self.is_suspending())
            .finish()
    }
}

/// Result of running a chain: the final text plus any functions that were
/// skipped because they failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    pub text: String,
    pub failures: Vec<StageFailure>,
}

/// Executes transform chains. Owns the runtime used for suspending
/// transforms; it is created on first use and reused afterwards.
#[derive(Default)]
pub struct TransformRunner {
    runtime: OnceLock<Runtime>,
}

impl fmt::Debug for TransformRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRunner")
            .field("runtime_started", &self.runtime.get().is_some())
            .finish()
    }
}

impl TransformRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, text: &str, transforms: &[Transform]) -> String {
        self.apply_traced(text, transforms).text
    }

    pub fn apply_traced(&self, text: &str, transforms: &[Transform]) -> ChainOutcome {
        let mut out = text.to_string();
        let mut failures = Vec::new();

        for transform in transforms {
            match self.run_one(transform, &out) {
                Ok(next) => {
                    if next != out {
                        debug!(transform = %transform.name, "transform changed text");
                    }
                    out = next;
                }
                Err(e) => {
                    warn!(transform = %transform.name, "transform function failed: {e:#}");
                    failures.push(StageFailure {
                        stage: StageKind::Transforms,
                        source: Some(transform.name.clone()),
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        ChainOutcome {
            text: out,
            failures,
        }
    }

    fn run_one(&self, transform: &Transform, text: &str) -> Result<String> {
        let outcome = match &transform.kind {
            TransformKind::Immediate(func) => {
                panic::catch_unwind(AssertUnwindSafe(|| func(text)))
            }
            TransformKind::Suspending(func) => {
                let runtime = self.runtime()?;
                let fut = func(text.to_string());
                panic::catch_unwind(AssertUnwindSafe(|| drive(runtime, fut)))
            }
        };

        match outcome {
            Ok(result) => result,
            Err(payload) => Err(anyhow!("panicked: {}", panic_message(payload.as_ref()))),
        }
    }

    fn runtime(&self) -> Result<&Runtime> {
        if let Some(runtime) = self.runtime.get() {
            return Ok(runtime);
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| anyhow!("Failed to start transform runtime: {}", e))?;
        Ok(self.runtime.get_or_init(|| runtime))
    }
}

// `Runtime::block_on` refuses to run on a thread that is already inside a
// runtime; in that case the future is driven from a scoped helper thread.
fn drive(runtime: &Runtime, fut: BoxedFuture) -> Result<String> {
    if Handle::try_current().is_err() {
        return runtime.block_on(fut);
    }
    thread::scope(|scope| {
        scope
            .spawn(|| runtime.block_on(fut))
            .join()
            .unwrap_or_else(|payload| panic::resume_unwind(payload))
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn upper() -> Transform {
        Transform::immediate("upper", |text: &str| text.to_uppercase())
    }

    fn exclaim() -> Transform {
        Transform::immediate("exclaim", |text: &str| format!("{text}!"))
    }

    fn failing() -> Transform {
        Transform::immediate("failing", |_: &str| -> Result<String> {
            Err(anyhow!("always fails"))
        })
    }

    #[test]
    fn test_chain_threads_output_in_order() {
        let runner = TransformRunner::new();
        let transforms = vec![upper(), exclaim()];
        assert_eq!(runner.apply("hi", &transforms), "HI!");
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let runner = TransformRunner::new();
        assert_eq!(runner.apply("same", &[]), "same");
    }

    #[test]
    fn test_failing_transform_is_skipped() {
        let runner = TransformRunner::new();
        let with_failure = vec![upper(), failing(), exclaim()];
        let without_failure = vec![upper(), exclaim()];

        let outcome = runner.apply_traced("hi", &with_failure);
        assert_eq!(outcome.text, runner.apply("hi", &without_failure));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].source.as_deref(), Some("failing"));
        assert_eq!(outcome.failures[0].stage, StageKind::Transforms);
    }

    #[test]
    fn test_panicking_transform_is_isolated() {
        let runner = TransformRunner::new();
        let transforms = vec![
            Transform::immediate("boom", |_: &str| -> String { panic!("kaboom") }),
            exclaim(),
        ];
        let outcome = runner.apply_traced("hi", &transforms);
        assert_eq!(outcome.text, "hi!");
        assert!(outcome.failures[0].reason.contains("kaboom"));
    }

    #[test]
    fn test_absent_result_becomes_empty_string() {
        let runner = TransformRunner::new();
        let transforms = vec![
            Transform::immediate("nothing", |_: &str| -> Option<String> { None }),
            exclaim(),
        ];
        assert_eq!(runner.apply("hi", &transforms), "!");
    }

    #[test]
    fn test_suspending_transform_runs_to_completion_in_order() {
        let runner = TransformRunner::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        let transforms = vec![
            Transform::suspending("slow_suffix", move |text: String| {
                let seen = seen.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    seen.fetch_add(1, Ordering::SeqCst);
                    format!("{text} world")
                }
            }),
            upper(),
        ];

        assert_eq!(runner.apply("hello", &transforms), "HELLO WORLD");
        assert_eq!(runner.apply("bye", &transforms), "BYE WORLD");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_suspending_transform_inside_caller_runtime() {
        let runner = TransformRunner::new();
        let transforms = vec![Transform::suspending("slow_suffix", |text: String| async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            format!("{text} world")
        })];

        let caller = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let outcome = caller.block_on(async { runner.apply_traced("hello", &transforms) });
        assert_eq!(outcome.text, "hello world");
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_failing_suspending_transform_is_skipped() {
        let runner = TransformRunner::new();
        let transforms = vec![
            Transform::suspending("remote", |_text: String| async move {
                Err::<String, _>(anyhow!("service unreachable"))
            }),
            exclaim(),
        ];
        let outcome = runner.apply_traced("hi", &transforms);
        assert_eq!(outcome.text, "hi!");
        assert!(outcome.failures[0].reason.contains("unreachable"));
    }

    #[test]
    fn test_transform_metadata() {
        let transform = upper().with_description("Uppercase everything");
        assert_eq!(transform.name(), "upper");
        assert_eq!(transform.description(), "Uppercase everything");
        assert!(!transform.is_suspending());
        assert!(Transform::suspending("s", |t: String| async move { t }).is_suspending());
    }
}
