use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Events emitted by the services after a state change commits. The channel
/// consumer only observes; nothing downstream of it can fail a request that
/// has already committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    ProductCreated(i32),
    ProductUpdated(i32),
    ProductDeleted(i32),

    // Inventory events
    StockAdjusted {
        product_id: i32,
        old_quantity: i32,
        new_quantity: i32,
    },

    // Promotion events
    PromotionCreated(i32),
    PromotionDeleted(i32),
    PromotionApplied {
        promo_id: i32,
        order_id: i32,
        discount: Decimal,
    },

    // Order events
    OrderCreated {
        order_id: i32,
        total_amount: Decimal,
        item_count: usize,
    },
    OrderDeleted {
        order_id: i32,
        items_restocked: usize,
    },

    // Payment events
    OrderPaid {
        order_id: i32,
        payment_id: i32,
        amount: Decimal,
    },
    PaymentDeleted {
        payment_id: i32,
        order_id: i32,
    },

    // Directory events
    CustomerCreated(i32),
    CustomerDeleted(i32),
    UserCreated(i32),
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

    /// Fire an event and log (rather than fail) if the channel is gone.
    /// Callers use this after their transaction commits.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("Failed to enqueue event: {}", e);
        }
    }
}

/// Consumes domain events and turns them into log lines and metrics.
/// Runs until every `EventSender` clone has been dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::ProductCreated(product_id) => {
                counter!("storeops.products.created", 1);
                info!(product_id, "Product created");
            }
            Event::ProductUpdated(product_id) => {
                info!(product_id, "Product updated");
            }
            Event::ProductDeleted(product_id) => {
                counter!("storeops.products.deleted", 1);
                info!(product_id, "Product deleted");
            }
            Event::StockAdjusted {
                product_id,
                old_quantity,
                new_quantity,
            } => {
                counter!("storeops.inventory.adjustments", 1);
                if new_quantity == 0 && old_quantity > 0 {
                    warn!(product_id, "Product is now out of stock");
                } else {
                    info!(product_id, old_quantity, new_quantity, "Stock adjusted");
                }
            }
            Event::PromotionCreated(promo_id) => {
                info!(promo_id, "Promotion created");
            }
            Event::PromotionDeleted(promo_id) => {
                info!(promo_id, "Promotion deleted");
            }
            Event::PromotionApplied {
                promo_id,
                order_id,
                discount,
            } => {
                counter!("storeops.promotions.applied", 1);
                info!(promo_id, order_id, discount = %discount, "Promotion applied to order");
            }
            Event::OrderCreated {
                order_id,
                total_amount,
                item_count,
            } => {
                counter!("storeops.orders.created", 1);
                info!(order_id, total_amount = %total_amount, item_count, "Order created");
            }
            Event::OrderDeleted {
                order_id,
                items_restocked,
            } => {
                counter!("storeops.orders.deleted", 1);
                info!(order_id, items_restocked, "Order deleted and stock restored");
            }
            Event::OrderPaid {
                order_id,
                payment_id,
                amount,
            } => {
                counter!("storeops.payments.recorded", 1);
                info!(order_id, payment_id, amount = %amount, "Order paid");
            }
            Event::PaymentDeleted {
                payment_id,
                order_id,
            } => {
                counter!("storeops.payments.deleted", 1);
                info!(payment_id, order_id, "Payment deleted, order back to pending");
            }
            Event::CustomerCreated(customer_id) => {
                info!(customer_id, "Customer created");
            }
            Event::CustomerDeleted(customer_id) => {
                info!(customer_id, "Customer deleted");
            }
            Event::UserCreated(user_id) => {
                info!(user_id, "User created");
            }
        }
    }

    info!("Event processing loop stopped");
}
