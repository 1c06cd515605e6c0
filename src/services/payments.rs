use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        customer,
        order::{self, OrderStatus},
        payment::{self, PaymentMethod},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::orders::{validate_cart, CartItemRequest, CreateOrderRequest, OrderService},
    PaginatedResponse,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PayOrderRequest {
    pub payment_method: PaymentMethod,
}

/// Checkout: create the order and record its payment in one transaction.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    pub customer_id: Option<i32>,
    pub user_id: Option<i32>,
    pub promo_code: Option<String>,
    #[validate(length(min = 1, message = "Cart cannot be empty"))]
    pub cart_items: Vec<CartItemRequest>,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutConfirmation {
    pub order_id: i32,
    pub payment_id: i32,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub promotion_message: String,
    pub message: String,
}

/// Row shape for the payment listing screen.
#[derive(Debug, Clone, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct PaymentSummary {
    pub payment_id: i32,
    pub order_id: i32,
    pub customer_name: Option<String>,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_date: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSort {
    #[default]
    IdDesc,
    IdAsc,
    DateDesc,
    DateAsc,
    AmountDesc,
    AmountAsc,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentFilter {
    /// Substring match on the paying customer's name.
    pub search: Option<String>,
    pub method: Option<PaymentMethod>,
    pub sort: Option<PaymentSort>,
}

/// Records and reverses payments. A payment flips its order to paid; at
/// most one live payment exists per order, and deleting it flips the
/// order back to pending.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DbPool>,
    orders: OrderService,
    event_sender: Option<EventSender>,
}

impl PaymentService {
    pub fn new(db: Arc<DbPool>, orders: OrderService, event_sender: Option<EventSender>) -> Self {
        Self {
            db,
            orders,
            event_sender,
        }
    }

    /// Records a payment for a pending order and marks it paid. Refused
    /// with no mutation when the order is already paid.
    #[instrument(skip(self))]
    pub async fn pay_order(
        &self,
        order_id: i32,
        payment_method: PaymentMethod,
    ) -> Result<payment::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::DatabaseError)?;

        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order #{} not found", order_id)))?;

        if order.status == OrderStatus::Paid {
            return Err(ServiceError::Conflict(format!(
                "Order #{} has already been paid",
                order_id
            )));
        }

        let amount = order.total_amount;
        let paid = payment::ActiveModel {
            order_id: Set(order_id),
            amount: Set(amount),
            payment_method: Set(payment_method),
            payment_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::DatabaseError)?;

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Paid);
        active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(order_id, payment_id = paid.payment_id, %amount, "Order paid");

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::OrderPaid {
                    order_id,
                    payment_id: paid.payment_id,
                    amount,
                })
                .await;
        }

        Ok(paid)
    }

    /// Removes a payment and reverts its order to pending.
    #[instrument(skip(self))]
    pub async fn delete_payment(&self, payment_id: i32) -> Result<(), ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::DatabaseError)?;

        let paid = payment::Entity::find_by_id(payment_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment #{} not found", payment_id)))?;

        let order = order::Entity::find_by_id(paid.order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if let Some(order) = order {
            let mut active: order::ActiveModel = order.into();
            active.status = Set(OrderStatus::Pending);
            active
                .update(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?;
        }

        let order_id = paid.order_id;
        payment::Entity::delete_by_id(payment_id)
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(payment_id, order_id, "Payment deleted, order back to pending");

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::PaymentDeleted {
                    payment_id,
                    order_id,
                })
                .await;
        }

        Ok(())
    }

    /// One-transaction checkout: the full order pipeline plus the payment
    /// record, committed together. If any step refuses, nothing persists.
    #[instrument(skip(self, request), fields(lines = request.cart_items.len()))]
    pub async fn checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutConfirmation, ServiceError> {
        request.validate()?;
        validate_cart(&request.cart_items)?;

        let order_request = CreateOrderRequest {
            customer_id: request.customer_id,
            user_id: request.user_id,
            promo_code: request.promo_code.clone(),
            cart_items: request.cart_items.clone(),
        };

        let txn = self.db.begin().await.map_err(ServiceError::DatabaseError)?;

        let placed = self.orders.create_order_in_txn(&txn, &order_request).await?;
        let order_id = placed.order.order_id;
        let amount = placed.order.total_amount;

        let paid = payment::ActiveModel {
            order_id: Set(order_id),
            amount: Set(amount),
            payment_method: Set(request.payment_method),
            payment_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::DatabaseError)?;

        let mut active: order::ActiveModel = placed.order.clone().into();
        active.status = Set(OrderStatus::Paid);
        active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(order_id, payment_id = paid.payment_id, %amount, "Checkout completed");

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::OrderCreated {
                    order_id,
                    total_amount: amount,
                    item_count: placed.item_count,
                })
                .await;
            if let Some(promo_id) = placed.order.promo_id {
                sender
                    .send_or_log(Event::PromotionApplied {
                        promo_id,
                        order_id,
                        discount: placed.order.discount_amount,
                    })
                    .await;
            }
            sender
                .send_or_log(Event::OrderPaid {
                    order_id,
                    payment_id: paid.payment_id,
                    amount,
                })
                .await;
        }

        Ok(CheckoutConfirmation {
            order_id,
            payment_id: paid.payment_id,
            total_amount: amount,
            discount_amount: placed.order.discount_amount,
            promotion_message: placed.promotion_message,
            message: format!(
                "Order #{} paid via {}.",
                order_id, request.payment_method
            ),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_payment(&self, payment_id: i32) -> Result<payment::Model, ServiceError> {
        payment::Entity::find_by_id(payment_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment #{} not found", payment_id)))
    }

    /// Payment listing joined through orders to the paying customer.
    #[instrument(skip(self))]
    pub async fn list_payments(
        &self,
        filter: PaymentFilter,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<PaymentSummary>, ServiceError> {
        let mut query = payment::Entity::find()
            .select_only()
            .column(payment::Column::PaymentId)
            .column(payment::Column::OrderId)
            .column_as(customer::Column::Name, "customer_name")
            .column(payment::Column::Amount)
            .column(payment::Column::PaymentMethod)
            .column(payment::Column::PaymentDate)
            .join(JoinType::LeftJoin, payment::Relation::Order.def())
            .join(JoinType::LeftJoin, order::Relation::Customer.def());

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(customer::Column::Name.like(&pattern));
        }
        if let Some(method) = filter.method {
            query = query.filter(payment::Column::PaymentMethod.eq(method));
        }

        query = match filter.sort.unwrap_or_default() {
            PaymentSort::IdDesc => query.order_by_desc(payment::Column::PaymentId),
            PaymentSort::IdAsc => query.order_by_asc(payment::Column::PaymentId),
            PaymentSort::DateDesc => query.order_by_desc(payment::Column::PaymentDate),
            PaymentSort::DateAsc => query.order_by_asc(payment::Column::PaymentDate),
            PaymentSort::AmountDesc => query.order_by_desc(payment::Column::Amount),
            PaymentSort::AmountAsc => query.order_by_asc(payment::Column::Amount),
        };

        let page = page.max(1);
        let limit = limit.max(1);
        let paginator = query
            .into_model::<PaymentSummary>()
            .paginate(&*self.db, limit);
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;
        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(PaginatedResponse::new(items, total, page, limit))
    }
}
