use pipeline_core::{AnalysisError, HybridTaskResult, TaskStatus};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Aggregate counters across one run, updated on every task exit path
#[derive(Debug, Default)]
pub struct RunStats {
    llm_used: AtomicU64,
    fallback_used: AtomicU64,
    failed: AtomicU64,
    completed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunStatsSnapshot {
    pub llm_used: u64,
    pub fallback_used: u64,
    pub failed: u64,
    pub completed: u64,
}

impl RunStats {
    pub fn snapshot(&self) -> RunStatsSnapshot {
        RunStatsSnapshot {
            llm_used: self.llm_used.load(Ordering::Relaxed),
            fallback_used: self.fallback_used.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HybridConfig {
    /// When false, an LLM failure surfaces directly instead of re-running
    /// the deterministic scorer
    pub fallback_enabled: bool,
    /// Bound on the LLM call; elapsing counts as an ordinary LLM failure
    pub llm_timeout: Duration,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            fallback_enabled: true,
            llm_timeout: Duration::from_secs(30),
        }
    }
}

/// Per-task execution context, released on every exit path via Drop
struct TaskContext<'a> {
    executor: &'a HybridExecutor,
    task: &'a str,
}

impl<'a> TaskContext<'a> {
    fn acquire(executor: &'a HybridExecutor, task: &'a str) -> Self {
        executor.active.fetch_add(1, Ordering::SeqCst);
        Self { executor, task }
    }
}

impl Drop for TaskContext<'_> {
    fn drop(&mut self) {
        self.executor.active.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!("task {} context released", self.task);
    }
}

/// Runs each scoring stage LLM-first with a deterministic fallback.
///
/// Task lifecycle: the llm attempt either succeeds, or (when enabled and
/// present) the fallback runs; a double failure carries both error texts.
pub struct HybridExecutor {
    config: HybridConfig,
    stats: Arc<RunStats>,
    active: AtomicU64,
}

impl HybridExecutor {
    pub fn new(config: HybridConfig) -> Self {
        Self {
            config,
            stats: Arc::new(RunStats::default()),
            active: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> RunStatsSnapshot {
        self.stats.snapshot()
    }

    /// In-flight task count; zero whenever no execute call is running
    pub fn active_tasks(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// LLM-first execution with optional deterministic fallback.
    pub async fn execute<T, L, F>(
        &self,
        task: &str,
        llm: L,
        fallback: Option<F>,
    ) -> HybridTaskResult<T>
    where
        L: Future<Output = Result<T, AnalysisError>>,
        F: FnOnce() -> Result<T, AnalysisError>,
    {
        let _context = TaskContext::acquire(self, task);
        self.stats.completed.fetch_add(1, Ordering::Relaxed);

        let llm_error = match tokio::time::timeout(self.config.llm_timeout, llm).await {
            Ok(Ok(value)) => {
                self.stats.llm_used.fetch_add(1, Ordering::Relaxed);
                return HybridTaskResult::llm_success(value);
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!(
                "LLM call exceeded {}s timeout",
                self.config.llm_timeout.as_secs()
            ),
        };

        tracing::warn!("task {}: LLM path failed: {}", task, llm_error);

        let fallback = match (self.config.fallback_enabled, fallback) {
            (true, Some(f)) => f,
            _ => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                return HybridTaskResult::failed(llm_error);
            }
        };

        match fallback() {
            Ok(value) => {
                self.stats.fallback_used.fetch_add(1, Ordering::Relaxed);
                HybridTaskResult::fallback_success(value)
            }
            Err(fallback_error) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                let error = AnalysisError::FallbackFailure {
                    llm_error,
                    fallback_error: fallback_error.to_string(),
                };
                tracing::error!("task {}: {}", task, error);
                HybridTaskResult::failed(error.to_string())
            }
        }
    }

    /// Deterministic-only execution for runs with no LLM client wired.
    /// The result reports neither llm nor fallback usage: the rule-based
    /// path was the primary path, not a recovery.
    pub fn execute_rule_based<T, F>(&self, task: &str, scorer: F) -> HybridTaskResult<T>
    where
        F: FnOnce() -> Result<T, AnalysisError>,
    {
        let _context = TaskContext::acquire(self, task);
        self.stats.completed.fetch_add(1, Ordering::Relaxed);

        match scorer() {
            Ok(value) => HybridTaskResult {
                status: TaskStatus::Success,
                result: Some(value),
                used_llm: false,
                used_fallback: false,
                error: None,
            },
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!("task {}: rule-based scorer failed: {}", task, e);
                HybridTaskResult::failed(e.to_string())
            }
        }
    }
}

impl Default for HybridExecutor {
    fn default() -> Self {
        Self::new(HybridConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Fallback = fn() -> Result<u32, AnalysisError>;

    fn quick_executor() -> HybridExecutor {
        HybridExecutor::new(HybridConfig {
            fallback_enabled: true,
            llm_timeout: Duration::from_millis(50),
        })
    }

    #[tokio::test]
    async fn llm_success_skips_fallback() {
        let executor = quick_executor();
        let result = executor
            .execute("score", async { Ok(7u32) }, Some((|| Ok(0)) as Fallback))
            .await;

        assert!(result.is_success());
        assert!(result.used_llm);
        assert!(!result.used_fallback);
        assert_eq!(result.result, Some(7));
        assert_eq!(executor.stats().llm_used, 1);
        assert_eq!(executor.stats().fallback_used, 0);
    }

    #[tokio::test]
    async fn llm_failure_triggers_fallback() {
        let executor = quick_executor();
        let result = executor
            .execute(
                "score",
                async { Err::<u32, _>(AnalysisError::LlmFailure("503".to_string())) },
                Some((|| Ok(42)) as Fallback),
            )
            .await;

        assert!(result.is_success());
        assert!(!result.used_llm);
        assert!(result.used_fallback);
        assert_eq!(result.result, Some(42));
        assert_eq!(executor.stats().fallback_used, 1);
    }

    #[tokio::test]
    async fn timeout_counts_as_llm_failure() {
        let executor = quick_executor();
        let result = executor
            .execute(
                "score",
                async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(1u32)
                },
                Some((|| Ok(9)) as Fallback),
            )
            .await;

        assert!(result.is_success());
        assert!(result.used_fallback);
        assert_eq!(result.result, Some(9));
    }

    #[tokio::test]
    async fn double_failure_carries_both_errors() {
        let executor = quick_executor();
        let result = executor
            .execute(
                "score",
                async { Err::<u32, _>(AnalysisError::LlmFailure("bad gateway".to_string())) },
                Some((|| Err(AnalysisError::CalculationError("divide by zero".to_string())))
                    as Fallback),
            )
            .await;

        assert_eq!(result.status, TaskStatus::Error);
        let error = result.error.unwrap();
        assert!(error.contains("bad gateway"));
        assert!(error.contains("divide by zero"));
        assert_eq!(executor.stats().failed, 1);
    }

    #[tokio::test]
    async fn fallback_disabled_surfaces_llm_error() {
        let executor = HybridExecutor::new(HybridConfig {
            fallback_enabled: false,
            llm_timeout: Duration::from_millis(50),
        });
        let result = executor
            .execute(
                "score",
                async { Err::<u32, _>(AnalysisError::LlmFailure("down".to_string())) },
                Some((|| Ok(1)) as Fallback),
            )
            .await;

        assert_eq!(result.status, TaskStatus::Error);
        assert!(!result.used_fallback);
        assert_eq!(executor.stats().failed, 1);
    }

    #[tokio::test]
    async fn missing_fallback_surfaces_llm_error() {
        let executor = quick_executor();
        let result = executor
            .execute(
                "score",
                async { Err::<u32, _>(AnalysisError::LlmFailure("down".to_string())) },
                None::<Fallback>,
            )
            .await;

        assert_eq!(result.status, TaskStatus::Error);
        assert!(result.error.unwrap().contains("down"));
    }

    #[tokio::test]
    async fn rule_based_mode_reports_no_llm_no_fallback() {
        let executor = quick_executor();
        let result = executor.execute_rule_based("score", || Ok(11u32));

        assert!(result.is_success());
        assert!(!result.used_llm);
        assert!(!result.used_fallback);
        assert_eq!(executor.stats().llm_used, 0);
        assert_eq!(executor.stats().fallback_used, 0);
    }

    #[tokio::test]
    async fn context_released_on_every_path() {
        let executor = quick_executor();

        let _ = executor
            .execute("a", async { Ok(1u32) }, Some((|| Ok(0)) as Fallback))
            .await;
        let _ = executor
            .execute(
                "b",
                async { Err::<u32, _>(AnalysisError::LlmFailure("x".to_string())) },
                Some((|| Err(AnalysisError::CalculationError("y".to_string()))) as Fallback),
            )
            .await;
        let _ = executor.execute_rule_based("c", || Ok(2u32));

        assert_eq!(executor.active_tasks(), 0);
        assert_eq!(executor.stats().completed, 3);
    }
}
