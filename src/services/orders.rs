use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseTransaction, EntityTrait,
    FromQueryResult, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        customer,
        order::{self, OrderStatus},
        order_item, payment, product, promotion, user,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        catalog::CatalogService, inventory::InventoryService, promotions::PromotionService,
    },
    PaginatedResponse,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CartItemRequest {
    pub product_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    /// None records a walk-in sale.
    pub customer_id: Option<i32>,
    /// Staff member recording the sale.
    pub user_id: Option<i32>,
    pub promo_code: Option<String>,
    #[validate(length(min = 1, message = "Cart cannot be empty"))]
    pub cart_items: Vec<CartItemRequest>,
}

/// Returned by a successful order creation. `promotion_message` carries
/// the evaluator's feedback even when the code was dropped, so the caller
/// can tell the difference between "no code" and "code rejected".
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderConfirmation {
    pub order_id: i32,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub promotion_message: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct QuoteRequest {
    pub promo_code: Option<String>,
    #[validate(length(min = 1, message = "Cart cannot be empty"))]
    pub cart_items: Vec<CartItemRequest>,
}

/// Priced cart before anything is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartQuote {
    pub raw_total: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub message: String,
    pub is_valid: bool,
    pub promotion_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderLineView {
    pub order_item_id: i32,
    pub product_id: Option<i32>,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetails {
    pub order_id: i32,
    pub customer_id: Option<i32>,
    pub customer_name: String,
    pub user_id: Option<i32>,
    pub promo_id: Option<i32>,
    pub promo_code: Option<String>,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub items: Vec<OrderLineView>,
    pub payment: Option<payment::Model>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct OrderSummary {
    pub order_id: i32,
    pub customer_id: Option<i32>,
    pub customer_name: Option<String>,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderSort {
    /// Newest order id first.
    #[default]
    Id,
    /// Most recent order date first.
    Date,
    /// Highest total first.
    Price,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    /// Substring match on the customer name.
    pub search: Option<String>,
    pub status: Option<OrderStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub min_total: Option<Decimal>,
    pub max_total: Option<Decimal>,
    pub sort: Option<OrderSort>,
}

/// A freshly persisted order plus what the caller needs to finish its
/// own transaction.
pub(crate) struct PlacedOrder {
    pub order: order::Model,
    pub item_count: usize,
    pub promotion_message: String,
}

/// Structural cart checks shared by order creation and checkout. Runs
/// before any database work.
pub(crate) fn validate_cart(cart_items: &[CartItemRequest]) -> Result<(), ServiceError> {
    if cart_items.is_empty() {
        return Err(ServiceError::ValidationError(
            "Cart cannot be empty".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for item in cart_items {
        if item.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1 for every cart line".to_string(),
            ));
        }
        if !seen.insert(item.product_id) {
            return Err(ServiceError::ValidationError(
                "Cart contains the same product more than once".to_string(),
            ));
        }
    }
    Ok(())
}

fn cart_subtotal(lines: &[(product::Model, i32)]) -> Decimal {
    lines
        .iter()
        .map(|(product, quantity)| product.price * Decimal::from(*quantity))
        .sum()
}

/// Keeps a requested page inside the actual page range, the way the
/// listing screens expect: past-the-end requests land on the last page.
fn clamp_page(page: u64, total: u64, limit: u64) -> u64 {
    let page = page.max(1);
    let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
    if total_pages > 0 && page > total_pages {
        total_pages
    } else {
        page
    }
}

/// Order workflow: cart validation, pricing, promotion application, stock
/// decrement and persistence as one unit of work, plus the symmetric
/// reversal on deletion.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    catalog: CatalogService,
    inventory: InventoryService,
    promotions: PromotionService,
    event_sender: Option<EventSender>,
}

impl OrderService {
    pub fn new(
        db: Arc<DbPool>,
        catalog: CatalogService,
        inventory: InventoryService,
        promotions: PromotionService,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            db,
            catalog,
            inventory,
            promotions,
            event_sender,
        }
    }

    /// Creates an order from a cart. Everything from the customer check to
    /// the stock decrements commits together or not at all.
    #[instrument(skip(self, request), fields(customer_id = ?request.customer_id, lines = request.cart_items.len()))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderConfirmation, ServiceError> {
        request.validate()?;
        validate_cart(&request.cart_items)?;

        let txn = self.db.begin().await.map_err(ServiceError::DatabaseError)?;
        let placed = self.create_order_in_txn(&txn, &request).await?;
        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(
            order_id = placed.order.order_id,
            total = %placed.order.total_amount,
            "Order created"
        );

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::OrderCreated {
                    order_id: placed.order.order_id,
                    total_amount: placed.order.total_amount,
                    item_count: placed.item_count,
                })
                .await;
            if let Some(promo_id) = placed.order.promo_id {
                sender
                    .send_or_log(Event::PromotionApplied {
                        promo_id,
                        order_id: placed.order.order_id,
                        discount: placed.order.discount_amount,
                    })
                    .await;
            }
        }

        Ok(OrderConfirmation {
            order_id: placed.order.order_id,
            total_amount: placed.order.total_amount,
            discount_amount: placed.order.discount_amount,
            promotion_message: placed.promotion_message,
            message: format!("Order #{} created successfully.", placed.order.order_id),
        })
    }

    /// The body of [`create_order`](Self::create_order), runnable inside a
    /// caller-owned transaction so checkout can append a payment before
    /// committing.
    pub(crate) async fn create_order_in_txn(
        &self,
        txn: &DatabaseTransaction,
        request: &CreateOrderRequest,
    ) -> Result<PlacedOrder, ServiceError> {
        if let Some(customer_id) = request.customer_id {
            customer::Entity::find_by_id(customer_id)
                .one(txn)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| {
                    ServiceError::ValidationError("Customer does not exist".to_string())
                })?;
        }
        if let Some(user_id) = request.user_id {
            user::Entity::find_by_id(user_id)
                .one(txn)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| ServiceError::ValidationError("User does not exist".to_string()))?;
        }

        let product_ids: Vec<i32> = request.cart_items.iter().map(|l| l.product_id).collect();
        let products = self.catalog.products_for_cart(txn, &product_ids).await?;

        let mut lines: Vec<(product::Model, i32)> = Vec::with_capacity(request.cart_items.len());
        for item in &request.cart_items {
            let product = products.get(&item.product_id).cloned().ok_or_else(|| {
                ServiceError::ValidationError("Some cart products no longer exist".to_string())
            })?;
            lines.push((product, item.quantity));
        }

        // Early sufficiency check for a friendly error; the write-time
        // guard below is what actually protects against races.
        let quantities = self.inventory.quantities_for(txn, &product_ids).await?;
        for (product, requested) in &lines {
            let available = quantities.get(&product.product_id).copied().unwrap_or(0);
            if available < *requested {
                return Err(ServiceError::InsufficientStock(format!(
                    "Not enough stock for {}, only {} left",
                    product.product_name, available
                )));
            }
        }

        let subtotal = cart_subtotal(&lines);

        let today = Utc::now().date_naive();
        let evaluation = self
            .promotions
            .evaluate(txn, request.promo_code.as_deref(), subtotal, today)
            .await?;

        // A rejected or exhausted code never fails the order; it is simply
        // not applied and the evaluator's message is passed along.
        let mut discount = Decimal::ZERO;
        let mut promo_id = None;
        let mut promotion_message = evaluation.message.clone();
        if evaluation.is_valid {
            if let Some(id) = evaluation.promotion_id() {
                if self.promotions.increment_used_count(txn, id).await? {
                    discount = evaluation.discount;
                    promo_id = Some(id);
                } else {
                    warn!(promo_id = id, "Promotion usage increment rejected, proceeding without it");
                    promotion_message = "Promotion code usage limit reached.".to_string();
                }
            }
        }

        let total = (subtotal - discount).max(Decimal::ZERO);

        let order = order::ActiveModel {
            customer_id: Set(request.customer_id),
            user_id: Set(request.user_id),
            promo_id: Set(promo_id),
            order_date: Set(Utc::now()),
            status: Set(OrderStatus::Pending),
            total_amount: Set(total),
            discount_amount: Set(discount),
            ..Default::default()
        }
        .insert(txn)
        .await
        .map_err(ServiceError::DatabaseError)?;

        for (product, quantity) in &lines {
            order_item::ActiveModel {
                order_id: Set(order.order_id),
                product_id: Set(Some(product.product_id)),
                quantity: Set(*quantity),
                price: Set(product.price),
                subtotal: Set(product.price * Decimal::from(*quantity)),
                ..Default::default()
            }
            .insert(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

            let decremented = self
                .inventory
                .decrement(txn, product.product_id, *quantity)
                .await?;
            if !decremented {
                let current = self
                    .inventory
                    .quantities_for(txn, &[product.product_id])
                    .await?
                    .get(&product.product_id)
                    .copied()
                    .unwrap_or(0);
                return Err(ServiceError::InsufficientStock(format!(
                    "Not enough stock for {}, only {} left",
                    product.product_name, current
                )));
            }
        }

        Ok(PlacedOrder {
            order,
            item_count: lines.len(),
            promotion_message,
        })
    }

    /// Prices a cart and evaluates a promotion code without persisting
    /// anything; this is what the cart screen calls on every change.
    #[instrument(skip(self, request), fields(lines = request.cart_items.len()))]
    pub async fn quote_cart(&self, request: QuoteRequest) -> Result<CartQuote, ServiceError> {
        request.validate()?;
        validate_cart(&request.cart_items)?;

        let db = &*self.db;
        let product_ids: Vec<i32> = request.cart_items.iter().map(|l| l.product_id).collect();
        let products = self.catalog.products_for_cart(db, &product_ids).await?;

        let mut lines: Vec<(product::Model, i32)> = Vec::with_capacity(request.cart_items.len());
        for item in &request.cart_items {
            let product = products.get(&item.product_id).cloned().ok_or_else(|| {
                ServiceError::ValidationError("Some cart products no longer exist".to_string())
            })?;
            lines.push((product, item.quantity));
        }

        let raw_total = cart_subtotal(&lines);
        let today = Utc::now().date_naive();
        let evaluation = self
            .promotions
            .evaluate(db, request.promo_code.as_deref(), raw_total, today)
            .await?;

        Ok(CartQuote {
            raw_total,
            discount: evaluation.discount,
            total: (raw_total - evaluation.discount).max(Decimal::ZERO),
            promotion_id: evaluation.promotion_id(),
            is_valid: evaluation.is_valid,
            message: evaluation.message,
        })
    }

    /// Order details for the receipt/detail screen.
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i32) -> Result<OrderDetails, ServiceError> {
        let db = &*self.db;

        let (order, customer) = order::Entity::find_by_id(order_id)
            .find_also_related(customer::Entity)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order #{} not found", order_id)))?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .find_also_related(product::Entity)
            .order_by_asc(order_item::Column::OrderItemId)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let payment = payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let promo_code = match order.promo_id {
            Some(promo_id) => promotion::Entity::find_by_id(promo_id)
                .one(db)
                .await
                .map_err(ServiceError::DatabaseError)?
                .map(|p| p.promo_code),
            None => None,
        };

        let customer_name = customer
            .map(|c| c.name)
            .unwrap_or_else(|| "Walk-in customer".to_string());

        let items = items
            .into_iter()
            .map(|(item, product)| OrderLineView {
                order_item_id: item.order_item_id,
                product_id: item.product_id,
                product_name: product
                    .map(|p| p.product_name)
                    .unwrap_or_else(|| "[deleted product]".to_string()),
                quantity: item.quantity,
                price: item.price,
                subtotal: item.subtotal,
            })
            .collect();

        Ok(OrderDetails {
            order_id: order.order_id,
            customer_id: order.customer_id,
            customer_name,
            user_id: order.user_id,
            promo_id: order.promo_id,
            promo_code,
            order_date: order.order_date,
            status: order.status,
            total_amount: order.total_amount,
            discount_amount: order.discount_amount,
            items,
            payment,
        })
    }

    /// Filtered order listing with the customer name joined in.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        filter: OrderFilter,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<OrderSummary>, ServiceError> {
        let mut query = order::Entity::find()
            .select_only()
            .column(order::Column::OrderId)
            .column(order::Column::CustomerId)
            .column_as(customer::Column::Name, "customer_name")
            .column(order::Column::OrderDate)
            .column(order::Column::Status)
            .column(order::Column::TotalAmount)
            .column(order::Column::DiscountAmount)
            .join(JoinType::LeftJoin, order::Relation::Customer.def());

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(customer::Column::Name.like(&pattern));
        }
        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status));
        }
        if let Some(from) = filter.date_from {
            let from = from.and_time(NaiveTime::MIN).and_utc();
            query = query.filter(order::Column::OrderDate.gte(from));
        }
        if let Some(to) = filter.date_to {
            // Inclusive day: everything strictly before the next midnight.
            let upper = (to + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();
            query = query.filter(order::Column::OrderDate.lt(upper));
        }
        if let Some(min_total) = filter.min_total {
            query = query.filter(order::Column::TotalAmount.gte(min_total));
        }
        if let Some(max_total) = filter.max_total {
            query = query.filter(order::Column::TotalAmount.lte(max_total));
        }

        query = match filter.sort.unwrap_or_default() {
            OrderSort::Id => query.order_by_desc(order::Column::OrderId),
            OrderSort::Date => query.order_by_desc(order::Column::OrderDate),
            OrderSort::Price => query.order_by_desc(order::Column::TotalAmount),
        };

        let limit = limit.max(1);
        let paginator = query.into_model::<OrderSummary>().paginate(&*self.db, limit);
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;
        let page = clamp_page(page, total, limit);
        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(PaginatedResponse::new(items, total, page, limit))
    }

    /// Deletes an order and reverses its side effects: stock goes back for
    /// every line whose product still exists, the promotion usage count is
    /// released, and any payment rows go with the order.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: i32) -> Result<(), ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::DatabaseError)?;

        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order #{} not found", order_id)))?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut items_restocked = 0;
        for item in &items {
            if let Some(product_id) = item.product_id {
                self.inventory
                    .increment(&txn, product_id, item.quantity)
                    .await?;
                items_restocked += 1;
            }
        }

        if let Some(promo_id) = order.promo_id {
            self.promotions.decrement_used_count(&txn, promo_id).await?;
        }

        payment::Entity::delete_many()
            .filter(payment::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        order::Entity::delete_by_id(order_id)
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(order_id, items_restocked, "Order deleted and its effects reversed");

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::OrderDeleted {
                    order_id,
                    items_restocked,
                })
                .await;
        }

        Ok(())
    }
}
