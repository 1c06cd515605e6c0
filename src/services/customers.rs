use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{customer, order},
    errors::ServiceError,
    events::{Event, EventSender},
    PaginatedResponse,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CustomerRequest {
    #[validate(length(min = 1, max = 100, message = "Customer name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 20, message = "Phone must be at most 20 characters"))]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CustomerSort {
    #[default]
    Id,
    NameAsc,
    NameDesc,
}

/// Customer plus their order history, for the detail screen.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerWithOrders {
    #[serde(flatten)]
    pub customer: customer::Model,
    pub orders: Vec<order::Model>,
}

#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
}

impl CustomerService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Paged customer listing with a name search.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        search: Option<&str>,
        sort: CustomerSort,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<customer::Model>, ServiceError> {
        let mut query = customer::Entity::find();

        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(customer::Column::Name.like(&pattern));
        }

        query = match sort {
            CustomerSort::Id => query.order_by_asc(customer::Column::CustomerId),
            CustomerSort::NameAsc => query.order_by_asc(customer::Column::Name),
            CustomerSort::NameDesc => query.order_by_desc(customer::Column::Name),
        };

        let page = page.max(1);
        let limit = limit.max(1);
        let paginator = query.paginate(&*self.db, limit);
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

    #[instrument(skip(self))]
    pub async fn get(&self, customer_id: i32) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(customer_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer #{} not found", customer_id)))
    }

    /// Customer with their orders, most recent first.
    #[instrument(skip(self))]
    pub async fn get_with_orders(
        &self,
        customer_id: i32,
    ) -> Result<CustomerWithOrders, ServiceError> {
        let customer = self.get(customer_id).await?;

        let orders = order::Entity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::OrderDate)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(CustomerWithOrders { customer, orders })
    }

    #[instrument(skip(self, request), fields(customer_name = %request.name))]
    pub async fn create(&self, request: CustomerRequest) -> Result<customer::Model, ServiceError> {
        request.validate()?;

        let model = customer::ActiveModel {
            name: Set(request.name.trim().to_string()),
            phone: Set(request.phone),
            email: Set(request.email),
            address: Set(request.address),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let created = model
            .insert(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(customer_id = created.customer_id, "Customer created");
        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::CustomerCreated(created.customer_id))
                .await;
        }

        Ok(created)
    }

    /// Full replacement of the contact fields.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        customer_id: i32,
        request: CustomerRequest,
    ) -> Result<customer::Model, ServiceError> {
        request.validate()?;

        let existing = self.get(customer_id).await?;

        let mut active: customer::ActiveModel = existing.into();
        active.name = Set(request.name.trim().to_string());
        active.phone = Set(request.phone);
        active.email = Set(request.email);
        active.address = Set(request.address);

        active
            .update(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Deletes a customer; their orders survive as walk-in sales.
    #[instrument(skip(self))]
    pub async fn delete(&self, customer_id: i32) -> Result<(), ServiceError> {
        let result = customer::Entity::delete_by_id(customer_id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Customer #{} not found",
                customer_id
            )));
        }

        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::CustomerDeleted(customer_id)).await;
        }

        Ok(())
    }
}
