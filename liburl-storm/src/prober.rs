use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use tokio::sync::{mpsc, Mutex};

use crate::{
    check::check_url,
    http::{build_client, ProbeError},
    sink::{drain, ReportSink},
    throttle::Throttle,
    types::{CancelFlag, Outcome, ProbeConfig, ThrottleConfig},
};

/// A single-target probe. The pool only depends on this, so anything that can
/// turn a target into an optional [`Outcome`] can drive it.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    async fn probe(&self, target: &str) -> Option<Outcome>;
}

#[derive(Clone)]
pub struct Prober {
    client: Client,
    config: ProbeConfig,
}

impl Prober {
    pub fn new() -> Result<Self, ProbeError> {
        Self::with_config(ProbeConfig::default())
    }

    /// Validates the configuration and builds the pooled client. A rejected
    /// configuration never causes any network activity.
    pub fn with_config(config: ProbeConfig) -> Result<Self, ProbeError> {
        if config.workers == 0 {
            return Err(ProbeError::InvalidWorkers(config.workers));
        }
        let client = build_client(&config)?;
        Ok(Self { client, config })
    }

    pub async fn probe_one(&self, target: &str) -> Option<Outcome> {
        check_url(&self.client, &self.config, target).await
    }

    /// Probes every target through the worker pool, reporting each outcome to
    /// `sink` as it arrives. Returns the deduplicated set once the queue is
    /// exhausted (or cancelled), all workers have exited, and the last
    /// outcome has been drained.
    pub async fn run<I, S>(&self, targets: I, cancel: CancelFlag, sink: S) -> HashSet<Outcome>
    where
        I: IntoIterator<Item = String>,
        S: ReportSink,
    {
        run_pool(
            Arc::new(self.clone()),
            self.config.workers,
            self.config.throttle,
            targets,
            cancel,
            sink,
        )
        .await
    }
}

#[async_trait]
impl Probe for Prober {
    async fn probe(&self, target: &str) -> Option<Outcome> {
        check_url(&self.client, &self.config, target).await
    }
}

/// The pool itself, generic over the probe implementation.
///
/// Shutdown is a fixed sequence: the dispatcher drops the work sender, the
/// workers drain what is queued and exit, and the result channel closes when
/// the last worker is gone, which lets the drain task finish. Worker exit
/// also closes the work channel, so a sink task that dies early unblocks
/// dispatch instead of wedging it.
///
/// A zero worker count dispatches nothing and returns an empty set;
/// [`Prober::with_config`] rejects it as an error before it gets here.
pub async fn run_pool<P, I, S>(
    probe: Arc<P>,
    workers: usize,
    throttle: Option<ThrottleConfig>,
    targets: I,
    cancel: CancelFlag,
    sink: S,
) -> HashSet<Outcome>
where
    P: Probe + ?Sized,
    I: IntoIterator<Item = String>,
    S: ReportSink,
{
    if workers == 0 {
        tracing::warn!("Worker pool requested with zero workers, nothing dispatched");
        return HashSet::new();
    }
    let (work_tx, work_rx) = mpsc::channel::<String>(workers);
    let (result_tx, result_rx) = mpsc::channel::<Outcome>(workers);
    let work_rx = Arc::new(Mutex::new(work_rx));

    let drain_handle = tokio::spawn(drain(result_rx, sink));

    let mut worker_handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let probe = Arc::clone(&probe);
        let work_rx = Arc::clone(&work_rx);
        let result_tx = result_tx.clone();
        worker_handles.push(tokio::spawn(async move {
            loop {
                // The lock is scoped to the dequeue; probing runs unlocked.
                let target = {
                    let mut work_rx = work_rx.lock().await;
                    work_rx.recv().await
                };
                match target {
                    Some(target) => {
                        if let Some(outcome) = probe.probe(&target).await {
                            if result_tx.send(outcome).await.is_err() {
                                break;
                            }
                        }
                    }
                    None => break,
                }
            }
        }));
    }
    // The workers now hold the only result senders and the only handles on
    // the work receiver; the last worker to exit closes both channels.
    drop(result_tx);
    drop(work_rx);

    let mut throttle = throttle.map(Throttle::new);
    let mut dispatched = 0u64;
    for target in targets {
        if let Some(throttle) = throttle.as_mut() {
            throttle.tick().await;
        }
        // Checked after the throttle pause, right before the send, so a
        // cancellation arriving mid-pause never lets another target out.
        if cancel.is_cancelled() {
            tracing::debug!("Cancellation observed after {} dispatches", dispatched);
            break;
        }
        if work_tx.send(target).await.is_err() {
            break;
        }
        dispatched += 1;
    }
    drop(work_tx);

    join_all(worker_handles).await;

    match drain_handle.await {
        Ok(outcomes) => outcomes,
        Err(err) => {
            tracing::warn!("Result sink task failed: {}", err);
            HashSet::new()
        }
    }
}
