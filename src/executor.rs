//! Fan-out of manifest fetches, one task per buildpack release.
//!
//! Every identity gets its own tokio task. Tasks share nothing but an mpsc
//! sender; each sends back exactly one `(index, Outcome)`. The executor does
//! not return until every task has reported (the completion barrier), and it
//! hands outcomes to the caller's sink either in listing order or in
//! completion order.

use crate::model::{BuildpackIdentity, ManifestResult};
use crate::traits::{FetchError, ManifestSource};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, instrument, warn, Instrument};

/// Order in which outcomes are handed to the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmitOrder {
    /// Original listing order, released as soon as every earlier entry is done.
    #[default]
    Listing,
    /// Whatever order tasks finish in.
    Completion,
}

/// Result of one fetch task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Fetched(ManifestResult),
    Failed {
        identity: BuildpackIdentity,
        error: FetchError,
    },
}

impl Outcome {
    pub fn identity(&self) -> &BuildpackIdentity {
        match self {
            Outcome::Fetched(result) => &result.identity,
            Outcome::Failed { identity, .. } => identity,
        }
    }
}

/// Everything the executor observed, in emission order.
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    pub outcomes: Vec<Outcome>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = (&BuildpackIdentity, &FetchError)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            Outcome::Failed { identity, error } => Some((identity, error)),
            Outcome::Fetched(_) => None,
        })
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

pub struct DeprecationExecutor {
    /// `None` means unbounded fan-out.
    semaphore: Option<Arc<Semaphore>>,
    order: EmitOrder,
}

impl Default for DeprecationExecutor {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl DeprecationExecutor {
    /// One in-flight fetch per identity.
    pub fn unbounded() -> Self {
        Self {
            semaphore: None,
            order: EmitOrder::default(),
        }
    }

    /// At most `concurrency_limit` fetches in flight (a limit of 0 is treated as 1).
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            semaphore: Some(Arc::new(Semaphore::new(concurrency_limit.max(1)))),
            order: EmitOrder::default(),
        }
    }

    pub fn with_order(mut self, order: EmitOrder) -> Self {
        self.order = order;
        self
    }

    /// Fetches every identity and collects the outcomes.
    pub async fn execute<S>(&self, source: Arc<S>, identities: Vec<BuildpackIdentity>) -> RunReport
    where
        S: ManifestSource + ?Sized + 'static,
    {
        self.execute_with(source, identities, |_| {}).await
    }

    /// Fetches every identity, passing each outcome to `sink` as it becomes
    /// emittable under the configured [`EmitOrder`].
    ///
    /// Returns after all tasks have finished; a failing task never cancels the others.
    #[instrument(skip_all, fields(buildpacks = identities.len(), order = ?self.order))]
    pub async fn execute_with<S, F>(
        &self,
        source: Arc<S>,
        identities: Vec<BuildpackIdentity>,
        mut sink: F,
    ) -> RunReport
    where
        S: ManifestSource + ?Sized + 'static,
        F: FnMut(&Outcome),
    {
        let total = identities.len();
        let (tx, mut rx) = mpsc::channel::<(usize, Outcome)>(total.max(1));
        let mut handles = Vec::with_capacity(total);

        for (index, identity) in identities.into_iter().enumerate() {
            let tx = tx.clone();
            let source = Arc::clone(&source);
            let semaphore = self.semaphore.clone();
            let span = tracing::info_span!("fetch", buildpack = %identity);

            let handle = tokio::spawn(
                async move {
                    let outcome = fetch_one(source.as_ref(), semaphore, identity).await;
                    // The receiver outlives every task; a send error only means shutdown.
                    let _ = tx.send((index, outcome)).await;
                }
                .instrument(span),
            );
            handles.push((index, handle));
        }
        drop(tx);

        let mut report = RunReport::default();
        let mut pending: BTreeMap<usize, Outcome> = BTreeMap::new();
        let mut next = 0;

        while let Some((index, outcome)) = rx.recv().await {
            match self.order {
                EmitOrder::Completion => emit(&mut report, &mut sink, outcome),
                EmitOrder::Listing => {
                    pending.insert(index, outcome);
                    while let Some(ready) = pending.remove(&next) {
                        emit(&mut report, &mut sink, ready);
                        next += 1;
                    }
                }
            }
        }

        // Tasks that panicked never sent; surface them as failures in their slot.
        for (index, handle) in handles {
            if let Err(e) = handle.await {
                error!(index, error = %e, "Fetch task aborted");
                if self.order == EmitOrder::Listing {
                    pending.insert(index, task_failure(index, &e));
                } else {
                    emit(&mut report, &mut sink, task_failure(index, &e));
                }
            }
        }
        for (_, outcome) in pending {
            emit(&mut report, &mut sink, outcome);
        }

        info!(
            total,
            failed = report.failure_count(),
            "All manifest fetches finished"
        );
        report
    }
}

async fn fetch_one<S>(
    source: &S,
    semaphore: Option<Arc<Semaphore>>,
    identity: BuildpackIdentity,
) -> Outcome
where
    S: ManifestSource + ?Sized,
{
    let _permit = match semaphore {
        Some(semaphore) => match semaphore.acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(e) => {
                return Outcome::Failed {
                    identity,
                    error: FetchError::Task(format!("Semaphore error: {}", e)),
                }
            }
        },
        None => None,
    };

    info!("Fetching manifest from {}", source.source_id());

    match source.fetch(&identity).await {
        Ok(manifest) => {
            let result = ManifestResult::new(identity, manifest.dependency_deprecation_dates);
            info!(records = result.records.len(), "Manifest fetched");
            Outcome::Fetched(result)
        }
        Err(error) => {
            warn!(%error, "Manifest fetch failed");
            Outcome::Failed { identity, error }
        }
    }
}

// A panicked task's identity is gone with it, so the slot is labelled by position.
fn task_failure(index: usize, e: &tokio::task::JoinError) -> Outcome {
    Outcome::Failed {
        identity: BuildpackIdentity {
            name: format!("task-{}", index),
            version_tag: String::new(),
        },
        error: FetchError::Task(e.to_string()),
    }
}

fn emit<F: FnMut(&Outcome)>(report: &mut RunReport, sink: &mut F, outcome: Outcome) {
    sink(&outcome);
    report.outcomes.push(outcome);
}
