use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events published after state changes commit. Consumers run out of
/// band; failure to deliver an event never fails the request that caused it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    ItemCreated(Uuid),
    ItemUpdated(Uuid),
    ItemArchived(Uuid),
    ItemRestored(Uuid),
    ItemImageUploaded { item_id: Uuid, image_id: Uuid },
    ItemImageDeleted { item_id: Uuid, image_id: Uuid },

    // Partner events
    PartnerCreated(Uuid),
    PartnerUpdated(Uuid),
    PartnerArchived(Uuid),
    PartnerRestored(Uuid),

    // Transaction events
    PurchaseRecorded {
        transaction_id: i64,
        document_number: String,
        total_amount: Decimal,
    },
    SaleRecorded {
        transaction_id: i64,
        document_number: String,
        total_amount: Decimal,
    },
    TransactionArchived(i64),
    TransactionRestored(i64),
    StockAdjusted {
        item_id: Uuid,
        delta: i64,
        quantity_on_hand: i64,
    },

    // Account events
    UserCreated(Uuid),
    UserUpdated(Uuid),
    UserDeactivated(Uuid),

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

impl Event {
    /// Create a generic event with string data
    pub fn with_data(data: String) -> Self {
        Event::Generic {
            message: data,
            timestamp: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging on failure instead of propagating it. Use from
    /// request paths where the write already committed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(err) = self.send(event).await {
            warn!("Dropping event: {}", err);
        }
    }
}

/// Trait for handling events. Handlers implementing this trait process events
/// asynchronously, off the request path.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: Event) -> Result<(), String>;
}

/// Drains the event channel, dispatching each event to the registered
/// handlers and logging it for audit purposes.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, handlers: Vec<Box<dyn EventHandler>>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::PurchaseRecorded {
                transaction_id,
                document_number,
                total_amount,
            } => {
                info!(
                    transaction_id,
                    document_number = %document_number,
                    total_amount = %total_amount,
                    "Purchase recorded"
                );
            }
            Event::SaleRecorded {
                transaction_id,
                document_number,
                total_amount,
            } => {
                info!(
                    transaction_id,
                    document_number = %document_number,
                    total_amount = %total_amount,
                    "Sale recorded"
                );
            }
            Event::StockAdjusted {
                item_id,
                delta,
                quantity_on_hand,
            } => {
                info!(
                    item_id = %item_id,
                    delta,
                    quantity_on_hand,
                    "Stock level adjusted"
                );
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }

        for handler in &handlers {
            if let Err(err) = handler.handle_event(event.clone()).await {
                warn!("Event handler failed: {}", err);
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle_event(&self, _event: Event) -> Result<(), String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn events_reach_registered_handlers() {
        let (tx, rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        let count = Arc::new(AtomicUsize::new(0));
        let task = tokio::spawn(process_events(
            rx,
            vec![Box::new(CountingHandler(count.clone()))],
        ));

        sender
            .send(Event::ItemCreated(Uuid::new_v4()))
            .await
            .unwrap();
        sender
            .send(Event::PartnerCreated(Uuid::new_v4()))
            .await
            .unwrap();
        drop(sender);

        task.await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel_errors() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or return an error
        sender.send_or_log(Event::with_data("late event".into())).await;
    }
}
