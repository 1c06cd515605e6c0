use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    db::DbPool,
    entities::{category, product, supplier},
    errors::ServiceError,
    events::{Event, EventSender},
    PaginatedResponse,
};

/// Auto-generated barcodes count up from this EAN-13-shaped seed; the first
/// generated code is 8900000000001.
const BARCODE_SEED: i64 = 8_900_000_000_000;

pub(crate) fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("must_be_non_negative"));
    }
    Ok(())
}

/// Next barcode given every barcode currently in the catalog: one past the
/// highest numeric code at or above the seed. Hand-entered codes below the
/// seed (or non-numeric ones) never influence the sequence.
fn next_barcode<'a, I>(existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing
        .into_iter()
        .filter_map(|b| b.parse::<i64>().ok())
        .filter(|&n| n >= BARCODE_SEED)
        .max()
        .unwrap_or(BARCODE_SEED);
    (max + 1).to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100, message = "Product name must be 1-100 characters"))]
    pub product_name: String,
    pub category_id: Option<i32>,
    pub supplier_id: Option<i32>,
    /// Omit to have a barcode generated.
    #[validate(length(max = 50, message = "Barcode must be at most 50 characters"))]
    pub barcode: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub price: Decimal,
    /// Sale unit, e.g. "pcs" or "kg".
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 100, message = "Product name must be 1-100 characters"))]
    pub product_name: Option<String>,
    pub category_id: Option<i32>,
    pub supplier_id: Option<i32>,
    #[validate(length(max = 50, message = "Barcode must be at most 50 characters"))]
    pub barcode: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub price: Option<Decimal>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Substring match on product name or barcode.
    pub keyword: Option<String>,
    pub category_id: Option<i32>,
    pub supplier_id: Option<i32>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Category name must be 1-100 characters"))]
    pub category_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SupplierRequest {
    #[validate(length(min = 1, max = 100, message = "Supplier name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 20, message = "Phone must be at most 20 characters"))]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Service for the product catalog and its category/supplier lookups.
///
/// Prices read here are snapshots for the order workflow; once an order line
/// captures a price, later catalog edits never touch it.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Batch product lookup for a cart. Ids without a matching product are
    /// simply absent from the map; the caller decides whether that aborts
    /// the operation.
    pub async fn products_for_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_ids: &[i32],
    ) -> Result<HashMap<i32, product::Model>, ServiceError> {
        let products = product::Entity::find()
            .filter(product::Column::ProductId.is_in(product_ids.to_vec()))
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(products.into_iter().map(|p| (p.product_id, p)).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: i32) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product #{} not found", product_id)))
    }

    /// Filtered catalog listing, newest first.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<product::Model>, ServiceError> {
        let mut query = product::Entity::find().order_by_desc(product::Column::CreatedAt);

        if let Some(keyword) = filter.keyword.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", keyword.trim());
            query = query.filter(
                Condition::any()
                    .add(product::Column::ProductName.like(&pattern))
                    .add(product::Column::Barcode.like(&pattern)),
            );
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(supplier_id) = filter.supplier_id {
            query = query.filter(product::Column::SupplierId.eq(supplier_id));
        }
        if let Some(min_price) = filter.min_price {
            query = query.filter(product::Column::Price.gte(min_price));
        }
        if let Some(max_price) = filter.max_price {
            query = query.filter(product::Column::Price.lte(max_price));
        }

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

    /// Creates a product, generating a barcode when none is supplied. The
    /// generate-and-insert pair runs in one transaction so two concurrent
    /// creates cannot claim the same generated code.
    #[instrument(skip(self, request), fields(product_name = %request.product_name))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(ServiceError::DatabaseError)?;

        if let Some(category_id) = request.category_id {
            category::Entity::find_by_id(category_id)
                .one(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!("Category #{} does not exist", category_id))
                })?;
        }
        if let Some(supplier_id) = request.supplier_id {
            supplier::Entity::find_by_id(supplier_id)
                .one(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!("Supplier #{} does not exist", supplier_id))
                })?;
        }

        let barcode = match request.barcode.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                let taken = product::Entity::find()
                    .filter(product::Column::Barcode.eq(code))
                    .one(&txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?;
                if taken.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "Barcode {} already exists",
                        code
                    )));
                }
                code.to_string()
            }
            _ => {
                let existing: Vec<String> = product::Entity::find()
                    .select_only()
                    .column(product::Column::Barcode)
                    .filter(product::Column::Barcode.is_not_null())
                    .into_tuple()
                    .all(&txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?;
                next_barcode(existing.iter().map(String::as_str))
            }
        };

        let model = product::ActiveModel {
            product_name: Set(request.product_name.trim().to_string()),
            category_id: Set(request.category_id),
            supplier_id: Set(request.supplier_id),
            barcode: Set(Some(barcode)),
            price: Set(request.price),
            unit: Set(request.unit.unwrap_or_else(|| "pcs".to_string())),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let created = model.insert(&txn).await.map_err(ServiceError::DatabaseError)?;
        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(product_id = created.product_id, "Product created");
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::ProductCreated(created.product_id)).await;
        }

        Ok(created)
    }

    /// Partial update; absent fields stay as they are.
    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        product_id: i32,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db;
        let existing = product::Entity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product #{} not found", product_id)))?;

        if let Some(category_id) = request.category_id {
            category::Entity::find_by_id(category_id)
                .one(db)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!("Category #{} does not exist", category_id))
                })?;
        }
        if let Some(supplier_id) = request.supplier_id {
            supplier::Entity::find_by_id(supplier_id)
                .one(db)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!("Supplier #{} does not exist", supplier_id))
                })?;
        }

        if let Some(barcode) = request.barcode.as_deref().map(str::trim) {
            if !barcode.is_empty() {
                let taken = product::Entity::find()
                    .filter(product::Column::Barcode.eq(barcode))
                    .filter(product::Column::ProductId.ne(product_id))
                    .one(db)
                    .await
                    .map_err(ServiceError::DatabaseError)?;
                if taken.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "Barcode {} already exists",
                        barcode
                    )));
                }
            }
        }

        let mut active: product::ActiveModel = existing.into();
        if let Some(name) = request.product_name {
            active.product_name = Set(name.trim().to_string());
        }
        if let Some(category_id) = request.category_id {
            active.category_id = Set(Some(category_id));
        }
        if let Some(supplier_id) = request.supplier_id {
            active.supplier_id = Set(Some(supplier_id));
        }
        if let Some(barcode) = request.barcode.as_deref().map(str::trim) {
            if !barcode.is_empty() {
                active.barcode = Set(Some(barcode.to_string()));
            }
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(unit) = request.unit {
            active.unit = Set(unit);
        }

        let updated = active.update(db).await.map_err(ServiceError::DatabaseError)?;

        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::ProductUpdated(updated.product_id)).await;
        }

        Ok(updated)
    }

    /// Deletes a product. Its stock row goes with it; order lines that
    /// reference it keep their snapshots with a null product id.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: i32) -> Result<(), ServiceError> {
        let result = product::Entity::delete_by_id(product_id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product #{} not found",
                product_id
            )));
        }

        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::ProductDeleted(product_id)).await;
        }

        Ok(())
    }

    // ---- categories ----

    /// All categories ordered by name, for form dropdowns.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        category::Entity::find()
            .order_by_asc(category::Column::CategoryName)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Paged category listing with name search.
    #[instrument(skip(self))]
    pub async fn list_categories_paged(
        &self,
        search: Option<&str>,
        sort_asc: bool,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<category::Model>, ServiceError> {
        let mut query = category::Entity::find();
        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(category::Column::CategoryName.like(&pattern));
        }
        query = if sort_asc {
            query.order_by_asc(category::Column::CategoryName)
        } else {
            query.order_by_desc(category::Column::CategoryName)
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
    pub async fn get_category(&self, category_id: i32) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(category_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Category #{} not found", category_id)))
    }

    #[instrument(skip(self, request), fields(category_name = %request.category_name))]
    pub async fn create_category(
        &self,
        request: CategoryRequest,
    ) -> Result<category::Model, ServiceError> {
        request.validate()?;
        let name = request.category_name.trim().to_string();

        let exists = category::Entity::find()
            .filter(category::Column::CategoryName.eq(&name))
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if exists.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category {} already exists",
                name
            )));
        }

        let model = category::ActiveModel {
            category_name: Set(name),
            ..Default::default()
        };
        model.insert(&*self.db).await.map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self, request))]
    pub async fn update_category(
        &self,
        category_id: i32,
        request: CategoryRequest,
    ) -> Result<category::Model, ServiceError> {
        request.validate()?;
        let name = request.category_name.trim().to_string();

        let existing = self.get_category(category_id).await?;

        let taken = category::Entity::find()
            .filter(category::Column::CategoryName.eq(&name))
            .filter(category::Column::CategoryId.ne(category_id))
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category {} already exists",
                name
            )));
        }

        let mut active: category::ActiveModel = existing.into();
        active.category_name = Set(name);
        active.update(&*self.db).await.map_err(ServiceError::DatabaseError)
    }

    /// Deletes a category; products that used it fall back to uncategorized.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, category_id: i32) -> Result<(), ServiceError> {
        let result = category::Entity::delete_by_id(category_id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Category #{} not found",
                category_id
            )));
        }
        Ok(())
    }

    // ---- suppliers ----

    /// All suppliers ordered by name, for form dropdowns.
    #[instrument(skip(self))]
    pub async fn list_suppliers(&self) -> Result<Vec<supplier::Model>, ServiceError> {
        supplier::Entity::find()
            .order_by_asc(supplier::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Paged supplier listing; the search term matches name, email, phone
    /// or address.
    #[instrument(skip(self))]
    pub async fn list_suppliers_paged(
        &self,
        search: Option<&str>,
        sort_asc: bool,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<supplier::Model>, ServiceError> {
        let mut query = supplier::Entity::find();
        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(
                Condition::any()
                    .add(supplier::Column::Name.like(&pattern))
                    .add(supplier::Column::Email.like(&pattern))
                    .add(supplier::Column::Phone.like(&pattern))
                    .add(supplier::Column::Address.like(&pattern)),
            );
        }
        query = if sort_asc {
            query.order_by_asc(supplier::Column::Name)
        } else {
            query.order_by_desc(supplier::Column::Name)
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
    pub async fn get_supplier(&self, supplier_id: i32) -> Result<supplier::Model, ServiceError> {
        supplier::Entity::find_by_id(supplier_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier #{} not found", supplier_id)))
    }

    #[instrument(skip(self, request), fields(supplier_name = %request.name))]
    pub async fn create_supplier(
        &self,
        request: SupplierRequest,
    ) -> Result<supplier::Model, ServiceError> {
        request.validate()?;

        if let Some(email) = request.email.as_deref().filter(|e| !e.is_empty()) {
            let taken = supplier::Entity::find()
                .filter(supplier::Column::Email.eq(email))
                .one(&*self.db)
                .await
                .map_err(ServiceError::DatabaseError)?;
            if taken.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "Supplier email {} already exists",
                    email
                )));
            }
        }

        let model = supplier::ActiveModel {
            name: Set(request.name.trim().to_string()),
            phone: Set(request.phone),
            email: Set(request.email),
            address: Set(request.address),
            ..Default::default()
        };
        model.insert(&*self.db).await.map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self, request))]
    pub async fn update_supplier(
        &self,
        supplier_id: i32,
        request: SupplierRequest,
    ) -> Result<supplier::Model, ServiceError> {
        request.validate()?;

        let existing = self.get_supplier(supplier_id).await?;

        if let Some(email) = request.email.as_deref().filter(|e| !e.is_empty()) {
            let taken = supplier::Entity::find()
                .filter(supplier::Column::Email.eq(email))
                .filter(supplier::Column::SupplierId.ne(supplier_id))
                .one(&*self.db)
                .await
                .map_err(ServiceError::DatabaseError)?;
            if taken.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "Supplier email {} already exists",
                    email
                )));
            }
        }

        let mut active: supplier::ActiveModel = existing.into();
        active.name = Set(request.name.trim().to_string());
        active.phone = Set(request.phone);
        active.email = Set(request.email);
        active.address = Set(request.address);
        active.update(&*self.db).await.map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self))]
    pub async fn delete_supplier(&self, supplier_id: i32) -> Result<(), ServiceError> {
        let result = supplier::Entity::delete_by_id(supplier_id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Supplier #{} not found",
                supplier_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn first_generated_barcode_starts_the_sequence() {
        assert_eq!(next_barcode([]), "8900000000001");
    }

    #[test]
    fn generated_barcode_continues_from_the_highest_code() {
        let existing = ["8900000000001", "8900000000007", "8900000000003"];
        assert_eq!(next_barcode(existing), "8900000000008");
    }

    #[test]
    fn hand_entered_codes_below_the_seed_are_ignored() {
        let existing = ["12345", "not-a-number", "4006381333931"];
        assert_eq!(next_barcode(existing), "8900000000001");
    }

    #[test]
    fn negative_price_fails_validation() {
        let request = CreateProductRequest {
            product_name: "Instant noodles".to_string(),
            category_id: None,
            supplier_id: None,
            barcode: None,
            price: dec!(-0.01),
            unit: None,
        };
        assert!(request.validate().is_err());

        let request = CreateProductRequest {
            price: dec!(0),
            ..request
        };
        assert!(request.validate().is_ok());
    }
}
