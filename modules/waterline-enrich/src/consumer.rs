use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::metrics::{
    MESSAGES_FAILED_TOTAL, MESSAGES_POISON_TOTAL, MESSAGES_PROCESSED_TOTAL,
    MESSAGES_RECEIVED_TOTAL,
};
use crate::processor::MessageProcessor;
use crate::traits::{InboundQueue, ReceivedMessage};

/// Polls the inbound queue and fans each message out to an independent
/// processing task. In-flight units are bounded by a semaphore so a deep
/// queue cannot pile unbounded concurrent calls onto the extraction service
/// or the store.
///
/// No lease renewal happens here: processing must finish well inside the
/// queue's visibility window or the message will be delivered a second time
/// while the first attempt is still running. The idempotent record keys make
/// that duplicate processing harmless.
pub struct QueueConsumer {
    queue: Arc<dyn InboundQueue>,
    processor: Arc<MessageProcessor>,
    in_flight: Arc<Semaphore>,
    poll_interval: Duration,
    max_receive_count: u32,
}

impl QueueConsumer {
    pub fn new(
        queue: Arc<dyn InboundQueue>,
        processor: Arc<MessageProcessor>,
        max_in_flight: usize,
        poll_interval_secs: u64,
        max_receive_count: u32,
    ) -> Self {
        info!(max_in_flight, max_receive_count, "Queue consumer ready");
        Self {
            queue,
            processor,
            in_flight: Arc::new(Semaphore::new(max_in_flight)),
            poll_interval: Duration::from_secs(poll_interval_secs),
            max_receive_count,
        }
    }

    /// Run the receive loop forever. Receive errors and empty polls both
    /// back off by the fixed poll interval.
    pub async fn run(&self) {
        loop {
            match self.queue.receive().await {
                Ok(messages) if messages.is_empty() => {
                    tokio::time::sleep(self.poll_interval).await;
                }
                Ok(messages) => {
                    for message in messages {
                        self.dispatch(message).await;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to receive from inbound queue");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Hand one message to a processing task, or discard it if the queue has
    /// redelivered it past the poison threshold. Waits for an in-flight
    /// permit before spawning, which is what bounds the fan-out.
    pub(crate) async fn dispatch(&self, message: ReceivedMessage) {
        counter!(MESSAGES_RECEIVED_TOTAL).increment(1);

        if message.receive_count > self.max_receive_count {
            counter!(MESSAGES_POISON_TOTAL).increment(1);
            error!(
                receive_count = message.receive_count,
                max_receive_count = self.max_receive_count,
                "Discarding poison message after repeated redelivery"
            );
            if let Err(e) = self.queue.delete(&message.receipt_handle).await {
                warn!(error = %e, "Failed to delete poison message");
            }
            return;
        }

        let permit = self
            .in_flight
            .clone()
            .acquire_owned()
            .await
            .expect("in-flight semaphore closed");

        let processor = self.processor.clone();
        tokio::spawn(async move {
            let _permit = permit;
            match processor.process(message).await {
                Ok(()) => {
                    counter!(MESSAGES_PROCESSED_TOTAL).increment(1);
                }
                Err(e) => {
                    counter!(MESSAGES_FAILED_TOTAL).increment(1);
                    warn!(error = %e, "Message processing failed, leaving for redelivery");
                }
            }
        });
    }

    /// Wait for every in-flight unit to finish by taking all permits.
    #[cfg(test)]
    pub(crate) async fn drain_for_test(&self, max_in_flight: u32) {
        let _all = self
            .in_flight
            .clone()
            .acquire_many_owned(max_in_flight)
            .await
            .expect("in-flight semaphore closed");
    }
}
