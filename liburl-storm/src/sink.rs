use std::collections::HashSet;

use tokio::sync::mpsc::Receiver;

use crate::types::{Outcome, StatusClass};

/// Receives every outcome as it arrives, already classified. There is exactly
/// one sink per run and it sees outcomes one at a time, so implementations
/// need no locking of their own.
pub trait ReportSink: Send + 'static {
    fn report(&mut self, outcome: &Outcome, class: StatusClass);
}

/// Discards everything.
impl ReportSink for () {
    fn report(&mut self, _outcome: &Outcome, _class: StatusClass) {}
}

// Every arrival is reported, including repeats; only the returned set
// deduplicates. Returns once all result senders are gone and the channel
// is drained.
pub(crate) async fn drain(
    mut results: Receiver<Outcome>,
    mut sink: impl ReportSink,
) -> HashSet<Outcome> {
    let mut outcomes = HashSet::new();
    while let Some(outcome) = results.recv().await {
        sink.report(&outcome, outcome.class());
        outcomes.insert(outcome);
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::sync::mpsc;

    use super::*;

    #[derive(Clone, Default)]
    struct Recording(Arc<Mutex<Vec<(u16, StatusClass)>>>);

    impl ReportSink for Recording {
        fn report(&mut self, outcome: &Outcome, class: StatusClass) {
            self.0.lock().unwrap().push((outcome.status, class));
        }
    }

    fn outcome(status: u16, url: &str) -> Outcome {
        Outcome {
            status,
            url: url.into(),
            length: None,
        }
    }

    #[tokio::test]
    async fn reports_every_arrival_but_stores_each_outcome_once() {
        let (tx, rx) = mpsc::channel(4);
        let recording = Recording::default();

        tx.send(outcome(200, "http://a")).await.unwrap();
        tx.send(outcome(200, "http://a")).await.unwrap();
        tx.send(outcome(404, "http://b")).await.unwrap();
        drop(tx);

        let outcomes = drain(rx, recording.clone()).await;
        assert_eq!(recording.0.lock().unwrap().len(), 3);
        assert_eq!(outcomes.len(), 2);
    }

    #[tokio::test]
    async fn classifies_outcomes_for_the_sink() {
        let (tx, rx) = mpsc::channel(4);
        let recording = Recording::default();

        tx.send(outcome(204, "http://a")).await.unwrap();
        tx.send(outcome(302, "http://b")).await.unwrap();
        tx.send(outcome(404, "http://c")).await.unwrap();
        tx.send(outcome(503, "http://d")).await.unwrap();
        drop(tx);

        drain(rx, recording.clone()).await;
        let seen = recording.0.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (204, StatusClass::Success),
                (302, StatusClass::Redirect),
                (404, StatusClass::ClientError),
                (503, StatusClass::ServerError),
            ]
        );
    }

    #[tokio::test]
    async fn finishes_only_after_the_channel_is_drained() {
        let (tx, rx) = mpsc::channel(16);
        for i in 0..10u16 {
            tx.send(outcome(200, &format!("http://host{}", i)))
                .await
                .unwrap();
        }
        drop(tx);

        let outcomes = drain(rx, ()).await;
        assert_eq!(outcomes.len(), 10);
    }
}
