pub mod categories;
pub mod common;
pub mod customers;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod products;
pub mod promotions;
pub mod suppliers;
pub mod users;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::catalog::CatalogService;
use crate::services::customers::CustomerService;
use crate::services::inventory::InventoryService;
use crate::services::orders::OrderService;
use crate::services::payments::PaymentService;
use crate::services::promotions::PromotionService;
use crate::services::users::UserService;

/// Service layer container handed to every HTTP handler through
/// `AppState`. The order workflow borrows the catalog, inventory and
/// promotion services, so those are built first.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: CatalogService,
    pub inventory: InventoryService,
    pub promotions: PromotionService,
    pub orders: OrderService,
    pub payments: PaymentService,
    pub customers: CustomerService,
    pub users: UserService,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Option<EventSender>,
        enforce_promo_usage_limit: bool,
    ) -> Self {
        let catalog = CatalogService::new(db.clone(), event_sender.clone());
        let inventory = InventoryService::new(db.clone(), event_sender.clone());
        let promotions = PromotionService::new(
            db.clone(),
            event_sender.clone(),
            enforce_promo_usage_limit,
        );
        let orders = OrderService::new(
            db.clone(),
            catalog.clone(),
            inventory.clone(),
            promotions.clone(),
            event_sender.clone(),
        );
        let payments = PaymentService::new(db.clone(), orders.clone(), event_sender.clone());
        let customers = CustomerService::new(db.clone(), event_sender.clone());
        let users = UserService::new(db, event_sender);

        Self {
            catalog,
            inventory,
            promotions,
            orders,
            payments,
            customers,
            users,
        }
    }
}
