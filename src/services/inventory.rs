use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    entities::{inventory_level, product},
    errors::ServiceError,
    events::{Event, EventSender},
    PaginatedResponse,
};

/// Stock level row joined with its product, as shown on the inventory page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockLevel {
    pub inventory_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockLevelFilter {
    /// Substring match on the product name.
    pub search: Option<String>,
}

/// Service for the on-hand stock ledger.
///
/// The `decrement`/`increment` pair only runs inside the order workflow's
/// transaction; everything else operates on the shared pool. A product
/// without a stock row reads as quantity 0.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
}

impl InventoryService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Current stock for a product. A missing row is 0, not an error.
    #[instrument(skip(self))]
    pub async fn quantity_of(&self, product_id: i32) -> Result<i32, ServiceError> {
        let level = inventory_level::Entity::find()
            .filter(inventory_level::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(level.map(|l| l.quantity).unwrap_or(0))
    }

    /// Current stock for a batch of products on an arbitrary connection, so
    /// the order workflow can read inside its own transaction. Products
    /// without a row are absent from the map.
    pub async fn quantities_for<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_ids: &[i32],
    ) -> Result<HashMap<i32, i32>, ServiceError> {
        let levels = inventory_level::Entity::find()
            .filter(inventory_level::Column::ProductId.is_in(product_ids.to_vec()))
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(levels
            .into_iter()
            .map(|l| (l.product_id, l.quantity))
            .collect())
    }

    /// Subtracts `qty` from a product's stock if and only if enough remains,
    /// in a single guarded UPDATE. Returns false (and mutates nothing) when
    /// the persisted quantity is already below `qty`, which is how a race
    /// between two order creations is lost safely.
    pub async fn decrement(
        &self,
        txn: &DatabaseTransaction,
        product_id: i32,
        qty: i32,
    ) -> Result<bool, ServiceError> {
        let result = inventory_level::Entity::update_many()
            .col_expr(
                inventory_level::Column::Quantity,
                Expr::col(inventory_level::Column::Quantity).sub(qty),
            )
            .col_expr(
                inventory_level::Column::UpdatedAt,
                Expr::value(Utc::now()),
            )
            .filter(inventory_level::Column::ProductId.eq(product_id))
            .filter(inventory_level::Column::Quantity.gte(qty))
            .exec(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(result.rows_affected == 1)
    }

    /// Adds `qty` back to a product's stock, creating the row if it has been
    /// removed in the meantime. Used by the order-reversal path; no upper
    /// bound applies.
    pub async fn increment(
        &self,
        txn: &DatabaseTransaction,
        product_id: i32,
        qty: i32,
    ) -> Result<(), ServiceError> {
        let result = inventory_level::Entity::update_many()
            .col_expr(
                inventory_level::Column::Quantity,
                Expr::col(inventory_level::Column::Quantity).add(qty),
            )
            .col_expr(
                inventory_level::Column::UpdatedAt,
                Expr::value(Utc::now()),
            )
            .filter(inventory_level::Column::ProductId.eq(product_id))
            .exec(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if result.rows_affected == 0 {
            let level = inventory_level::ActiveModel {
                product_id: Set(product_id),
                quantity: Set(qty),
                updated_at: Set(Utc::now()),
                ..Default::default()
            };
            level
                .insert(txn)
                .await
                .map_err(ServiceError::DatabaseError)?;
        }

        Ok(())
    }

    /// Sets a product's stock to an absolute value (restock), creating the
    /// row when missing.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        product_id: i32,
        quantity: i32,
    ) -> Result<inventory_level::Model, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Quantity cannot be negative".to_string(),
            ));
        }

        let db = &*self.db;
        product::Entity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product #{} not found", product_id)))?;

        let existing = inventory_level::Entity::find()
            .filter(inventory_level::Column::ProductId.eq(product_id))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let old_quantity = existing.as_ref().map(|l| l.quantity).unwrap_or(0);

        let updated = match existing {
            Some(level) => {
                let mut active: inventory_level::ActiveModel = level.into();
                active.quantity = Set(quantity);
                active.updated_at = Set(Utc::now());
                active.update(db).await.map_err(ServiceError::DatabaseError)?
            }
            None => {
                let level = inventory_level::ActiveModel {
                    product_id: Set(product_id),
                    quantity: Set(quantity),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                };
                level.insert(db).await.map_err(ServiceError::DatabaseError)?
            }
        };

        info!(product_id, old_quantity, quantity, "Stock level set");
        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::StockAdjusted {
                    product_id,
                    old_quantity,
                    new_quantity: quantity,
                })
                .await;
        }

        Ok(updated)
    }

    /// Paged stock listing joined with product names.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: StockLevelFilter,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<StockLevel>, ServiceError> {
        let mut query = inventory_level::Entity::find()
            .find_also_related(product::Entity)
            .order_by_asc(inventory_level::Column::ProductId);

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(product::Column::ProductName.like(&pattern));
        }

        let page = page.max(1);
        let limit = limit.max(1);

        let paginator = query.paginate(&*self.db, limit);
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;
        let rows = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let items = rows
            .into_iter()
            .map(|(level, prod)| StockLevel {
                inventory_id: level.inventory_id,
                product_id: level.product_id,
                product_name: prod.map(|p| p.product_name).unwrap_or_default(),
                quantity: level.quantity,
                updated_at: level.updated_at,
            })
            .collect();

        Ok(PaginatedResponse::new(items, total, page, limit))
    }

    /// Single stock row by its own id.
    #[instrument(skip(self))]
    pub async fn get(&self, inventory_id: i32) -> Result<StockLevel, ServiceError> {
        let (level, prod) = inventory_level::Entity::find_by_id(inventory_id)
            .find_also_related(product::Entity)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory record #{} not found", inventory_id))
            })?;

        Ok(StockLevel {
            inventory_id: level.inventory_id,
            product_id: level.product_id,
            product_name: prod.map(|p| p.product_name).unwrap_or_default(),
            quantity: level.quantity,
            updated_at: level.updated_at,
        })
    }

    /// Removes a stock row entirely; the product then reads as quantity 0.
    #[instrument(skip(self))]
    pub async fn delete(&self, inventory_id: i32) -> Result<(), ServiceError> {
        let result = inventory_level::Entity::delete_by_id(inventory_id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Inventory record #{} not found",
                inventory_id
            )));
        }

        Ok(())
    }
}
