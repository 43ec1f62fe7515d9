//! Broadcast of one status stream to several consumers
//!
//! With a single consumer the inbound queue is handed over directly. With
//! more, a [`Forwarder`] owns the inbound queue and pushes every event into
//! each consumer's bounded queue before taking the next one. A consumer that
//! stops draining therefore stalls all of them; events are never dropped.

use super::{channel, StatusReceiver, StatusSender};
use tracing::{debug, warn};

/// Moves events from the inbound queue to every consumer queue
#[derive(Debug)]
pub struct Forwarder {
    inbound: StatusReceiver,
    outbound: Vec<StatusSender>,
}

impl Forwarder {
    /// Number of consumer queues still attached
    pub fn consumers(&self) -> usize {
        self.outbound.len()
    }

    /// Forward until the inbound queue is closed and drained.
    ///
    /// Consumer queues close when this returns. A consumer that has gone
    /// away is detached with a warning; delivery to the others continues.
    pub async fn run(mut self) {
        let mut forwarded = 0usize;
        while let Some(event) = self.inbound.recv().await {
            let mut idx = 0;
            while idx < self.outbound.len() {
                if self.outbound[idx].send(event.clone()).await.is_err() {
                    warn!("status consumer {} went away, detaching it", idx);
                    self.outbound.remove(idx);
                } else {
                    idx += 1;
                }
            }
            forwarded += 1;
        }
        debug!("status stream closed after {} events", forwarded);
    }
}

/// Split an inbound status queue into `consumers` queues.
///
/// Returns the forwarder to spawn (if one is needed) and one receiver per
/// consumer, in registration order.
pub fn fan_out(
    inbound: StatusReceiver,
    consumers: usize,
    capacity: usize,
) -> (Option<Forwarder>, Vec<StatusReceiver>) {
    if consumers <= 1 {
        return (None, vec![inbound]);
    }

    let (outbound, receivers): (Vec<_>, Vec<_>) = (0..consumers).map(|_| channel(capacity)).unzip();
    (Some(Forwarder { inbound, outbound }), receivers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{SolveStatus, StatusEvent, Vertex};
    use std::sync::Arc;

    fn event(name: &str) -> StatusEvent {
        Arc::new(SolveStatus {
            vertexes: vec![Vertex {
                digest: format!("sha256:{}", name),
                name: name.to_string(),
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    async fn collect(mut rx: StatusReceiver) -> Vec<String> {
        let mut names = Vec::new();
        while let Some(ev) = rx.recv().await {
            names.push(ev.vertexes[0].name.clone());
        }
        names
    }

    #[tokio::test]
    async fn single_consumer_gets_inbound_directly() {
        let (tx, rx) = channel(4);
        let (forwarder, mut receivers) = fan_out(rx, 1, 4);
        assert!(forwarder.is_none());
        assert_eq!(receivers.len(), 1);

        tx.send(event("A")).await.unwrap();
        drop(tx);
        let names = collect(receivers.remove(0)).await;
        assert_eq!(names, vec!["A"]);
    }

    #[tokio::test]
    async fn two_consumers_see_same_events_in_order() {
        let (tx, rx) = channel(1);
        let (forwarder, receivers) = fan_out(rx, 2, 1);
        let forwarder = forwarder.unwrap();
        assert_eq!(forwarder.consumers(), 2);

        let forward = tokio::spawn(forwarder.run());
        let mut receivers = receivers.into_iter();
        let first = tokio::spawn(collect(receivers.next().unwrap()));
        let second = tokio::spawn(collect(receivers.next().unwrap()));

        for name in ["A", "B", "C"] {
            tx.send(event(name)).await.unwrap();
        }
        drop(tx);

        forward.await.unwrap();
        assert_eq!(first.await.unwrap(), vec!["A", "B", "C"]);
        assert_eq!(second.await.unwrap(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn consumers_close_only_after_inbound_exhausted() {
        let (tx, rx) = channel(4);
        let (forwarder, receivers) = fan_out(rx, 2, 4);
        let forward = tokio::spawn(forwarder.unwrap().run());
        let mut receivers = receivers.into_iter();
        let mut first = receivers.next().unwrap();
        let _second = receivers.next().unwrap();

        tx.send(event("A")).await.unwrap();
        assert_eq!(first.recv().await.unwrap().vertexes[0].name, "A");

        // inbound still open: the consumer must not observe completion
        let pending =
            tokio::time::timeout(std::time::Duration::from_millis(50), first.recv()).await;
        assert!(pending.is_err());

        drop(tx);
        forward.await.unwrap();
        assert!(first.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropped_consumer_does_not_stop_others() {
        let (tx, rx) = channel(4);
        let (forwarder, receivers) = fan_out(rx, 2, 4);
        let forward = tokio::spawn(forwarder.unwrap().run());
        let mut receivers = receivers.into_iter();
        drop(receivers.next().unwrap());
        let survivor = tokio::spawn(collect(receivers.next().unwrap()));

        for name in ["A", "B"] {
            tx.send(event(name)).await.unwrap();
        }
        drop(tx);

        forward.await.unwrap();
        assert_eq!(survivor.await.unwrap(), vec!["A", "B"]);
    }
}
