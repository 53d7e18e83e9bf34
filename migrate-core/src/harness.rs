//! The bounded-parallel processing harness (C1). Every pipeline stage that
//! fans out over a list of items — export item fetch, asset upload,
//! language-variant import — goes through `process_items` so that
//! parallelism limits, per-item error classification, and progress
//! reporting live in exactly one place.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::MigrateError;

/// The result of processing one item: success, a tolerated 404, a fatal
/// per-item error, or (ambient addition, §5 "Cancellation") cancelled
/// before or during processing.
#[derive(Debug)]
pub enum ProcessOutcome<O> {
    Valid(O),
    NotFound,
    Error(MigrateError),
    Cancelled,
}

impl<O> ProcessOutcome<O> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn into_valid(self) -> Option<O> {
        match self {
            Self::Valid(value) => Some(value),
            _ => None,
        }
    }
}

/// Injected by the caller so the harness can report progress without
/// depending on any terminal/telemetry crate itself.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, done: usize, total: usize, item_info: &str);
}

pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_progress(&self, _done: usize, _total: usize, _item_info: &str) {}
}

#[derive(Debug, Clone, Copy)]
pub struct ProcessItemsOptions {
    pub parallel_limit: usize,
    pub fail_on_error: bool,
}

impl ProcessItemsOptions {
    pub fn new(parallel_limit: usize) -> Self {
        Self {
            parallel_limit,
            fail_on_error: false,
        }
    }

    pub fn fail_on_error(mut self, fail_on_error: bool) -> Self {
        self.fail_on_error = fail_on_error;
        self
    }
}

/// Bounded-parallel map with per-item retry/error classification already
/// folded into `process_item`'s return value, progress reporting, and
/// (§5) cooperative cancellation.
///
/// Returns `Err` only when `options.fail_on_error` is set and at least one
/// item produced `ProcessOutcome::Error`; on success every slot in the
/// returned vector corresponds to the input item at the same index.
pub async fn process_items<I, O, L, F, Fut>(
    items: Vec<I>,
    options: ProcessItemsOptions,
    item_label: L,
    progress: &dyn ProgressSink,
    cancellation: CancellationToken,
    process_item: F,
) -> Result<Vec<ProcessOutcome<O>>, MigrateError>
where
    I: Send + 'static,
    O: Send + 'static,
    L: Fn(&I) -> String,
    F: Fn(I) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = ProcessOutcome<O>> + Send + 'static,
{
    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(options.parallel_limit.max(1)));
    let abort = Arc::new(AtomicBool::new(false));

    let tasks = items.into_iter().map(|item| {
        let label = item_label(&item);
        let semaphore = Arc::clone(&semaphore);
        let abort = Arc::clone(&abort);
        let cancellation = cancellation.clone();
        let process_item = process_item.clone();
        let fail_on_error = options.fail_on_error;

        async move {
            if cancellation.is_cancelled() || abort.load(Ordering::SeqCst) {
                return (label, ProcessOutcome::Cancelled);
            }
            let permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return (label, ProcessOutcome::Cancelled),
            };
            if cancellation.is_cancelled() || abort.load(Ordering::SeqCst) {
                drop(permit);
                return (label, ProcessOutcome::Cancelled);
            }

            let outcome = process_item(item).await;
            drop(permit);

            if fail_on_error && matches!(outcome, ProcessOutcome::Error(_)) {
                abort.store(true, Ordering::SeqCst);
            }
            (label, outcome)
        }
    });

    let done = AtomicUsize::new(0);
    let labelled_results = join_all(tasks).await;

    let mut first_error: Option<MigrateError> = None;
    let mut results = Vec::with_capacity(total);
    for (label, outcome) in labelled_results {
        let processed = done.fetch_add(1, Ordering::SeqCst) + 1;
        let percent = ((processed * 100) as f64 / total.max(1) as f64).round() as u64;
        progress.on_progress(processed, total, &format!("{percent}% {label}"));

        if let ProcessOutcome::Error(err) = &outcome {
            if options.fail_on_error && first_error.is_none() {
                first_error = Some(MigrateError::processing(label.clone(), err.to_string()));
            }
        }
        results.push(outcome);
    }

    if let Some(err) = first_error {
        return Err(err);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[tokio::test]
    async fn preserves_input_order_and_classifies_outcomes() {
        let items = vec![1, 2, 3, 4];
        let results = process_items(
            items,
            ProcessItemsOptions::new(2),
            |i: &i32| i.to_string(),
            &NullProgressSink,
            CancellationToken::new(),
            |item| async move {
                if item == 3 {
                    ProcessOutcome::NotFound
                } else {
                    ProcessOutcome::Valid(item * 10)
                }
            },
        )
        .await
        .expect("no fail_on_error configured");

        assert_eq!(results.len(), 4);
        assert!(matches!(results[0], ProcessOutcome::Valid(10)));
        assert!(matches!(results[1], ProcessOutcome::Valid(20)));
        assert!(matches!(results[2], ProcessOutcome::NotFound));
        assert!(matches!(results[3], ProcessOutcome::Valid(40)));
    }

    #[tokio::test]
    async fn fail_on_error_propagates_first_error() {
        let items = vec![1, 2, 3];
        let err = process_items(
            items,
            ProcessItemsOptions::new(1).fail_on_error(true),
            |i: &i32| i.to_string(),
            &NullProgressSink,
            CancellationToken::new(),
            |item| async move {
                if item == 2 {
                    ProcessOutcome::Error(MigrateError::transform("boom"))
                } else {
                    ProcessOutcome::Valid(item)
                }
            },
        )
        .await
        .expect_err("second item errors with fail_on_error set");

        assert!(matches!(err, MigrateError::Processing { .. }));
    }

    #[tokio::test]
    async fn reports_progress_for_every_completion() {
        let log: Mutex<Vec<(usize, usize)>> = Mutex::new(Vec::new());
        struct Recorder<'a>(&'a Mutex<Vec<(usize, usize)>>);
        impl ProgressSink for Recorder<'_> {
            fn on_progress(&self, done: usize, total: usize, _item_info: &str) {
                self.0.lock().expect("lock poisoned").push((done, total));
            }
        }
        let recorder = Recorder(&log);

        let items = vec![1, 2, 3];
        let _ = process_items(
            items,
            ProcessItemsOptions::new(3),
            |i: &i32| i.to_string(),
            &recorder,
            CancellationToken::new(),
            |item| async move { ProcessOutcome::Valid(item) },
        )
        .await
        .expect("no failures");

        assert_eq!(log.lock().expect("lock poisoned").len(), 3);
    }

    #[tokio::test]
    async fn cancellation_token_short_circuits_pending_work() {
        let token = CancellationToken::new();
        token.cancel();

        let items = vec![1, 2, 3];
        let results = process_items(
            items,
            ProcessItemsOptions::new(1),
            |i: &i32| i.to_string(),
            &NullProgressSink,
            token,
            |item| async move { ProcessOutcome::Valid(item) },
        )
        .await
        .expect("cancellation is not a fail_on_error");

        assert!(
            results
                .iter()
                .all(|outcome| matches!(outcome, ProcessOutcome::Cancelled))
        );
    }
}
