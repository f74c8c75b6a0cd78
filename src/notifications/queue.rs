use std::{sync::Arc, time::Duration};

use backoff::{future::retry, ExponentialBackoff};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, info, warn};

use super::sender::MessageSender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Bounded hand-off from request handlers to a single delivery worker.
///
/// Enqueueing never waits: a full or closed queue drops the message with a
/// log line. The worker retries each message with exponential backoff until
/// `max_elapsed` and logs the final outcome.
#[derive(Clone)]
pub struct EmailQueue {
    tx: mpsc::Sender<OutboundEmail>,
}

impl EmailQueue {
    pub fn start(
        sender: Arc<dyn MessageSender>,
        capacity: usize,
        max_elapsed: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(rx, sender, max_elapsed));
        (Self { tx }, worker)
    }

    /// Returns whether the message was accepted.
    pub fn enqueue(&self, email: OutboundEmail) -> bool {
        match self.tx.try_send(email) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(email)) => {
                warn!(to = %email.to, "email queue full; message dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(email)) => {
                error!(to = %email.to, "email queue closed; message dropped");
                false
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<OutboundEmail>,
    sender: Arc<dyn MessageSender>,
    max_elapsed: Duration,
) {
    while let Some(email) = rx.recv().await {
        let policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(200),
            max_elapsed_time: Some(max_elapsed),
            ..Default::default()
        };

        let (sender, email) = (&sender, &email);
        let result = retry(policy, || async move {
            sender
                .send(&email.to, &email.subject, &email.html)
                .await
                .map_err(|e| {
                    warn!(to = %email.to, error = %e, "email delivery attempt failed");
                    backoff::Error::transient(e)
                })
        })
        .await;

        match result {
            Ok(()) => info!(to = %email.to, subject = %email.subject, "email delivered"),
            Err(e) => error!(to = %email.to, error = %e, "email delivery gave up"),
        }
    }
    info!("email worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FlakySender, RecordingSender};

    fn email(to: &str) -> OutboundEmail {
        OutboundEmail {
            to: to.into(),
            subject: "Your verification code".into(),
            html: "<p>123456</p>".into(),
        }
    }

    #[tokio::test]
    async fn delivers_queued_messages_in_order() {
        let sender = Arc::new(RecordingSender::default());
        let (queue, worker) = EmailQueue::start(sender.clone(), 8, Duration::from_secs(1));
        assert!(queue.enqueue(email("a@x.com")));
        assert!(queue.enqueue(email("b@x.com")));
        drop(queue);
        worker.await.unwrap();

        let sent = sender.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "a@x.com");
        assert_eq!(sent[1].to, "b@x.com");
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let sender = Arc::new(FlakySender::failing_times(2));
        let (queue, worker) = EmailQueue::start(sender.clone(), 8, Duration::from_secs(10));
        queue.enqueue(email("a@x.com"));
        drop(queue);
        worker.await.unwrap();

        assert_eq!(sender.attempts(), 3);
        assert_eq!(sender.delivered(), 1);
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let sender = Arc::new(FlakySender::failing_times(usize::MAX));
        let (queue, _worker) = EmailQueue::start(sender, 1, Duration::from_secs(30));
        let accepted = (0..10)
            .map(|i| queue.enqueue(email(&format!("{i}@x.com"))))
            .filter(|ok| *ok)
            .count();
        assert!(accepted < 10);
    }
}
