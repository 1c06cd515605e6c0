use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StoreOps API",
        version = "0.1.0",
        description = r#"
Backend service for small-retail store operations.

Covers the product catalog (products, categories, suppliers), on-hand
inventory, promotion codes, customer and staff records, order intake
and payment recording. Orders are transactional: price snapshots,
promo application and stock decrements commit together or not at all.

Every response is wrapped in an envelope with `success`, `data`,
`message` and `errors` fields plus request metadata. List endpoints
take `page` and `limit` query parameters; the limit is capped by
server configuration.
        "#,
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Product catalog"),
        (name = "Categories", description = "Product categories"),
        (name = "Suppliers", description = "Supplier directory"),
        (name = "Inventory", description = "On-hand stock levels"),
        (name = "Promotions", description = "Promotion codes"),
        (name = "Orders", description = "Order intake and lookup"),
        (name = "Payments", description = "Payment recording and checkout"),
        (name = "Customers", description = "Customer records"),
        (name = "Users", description = "Staff accounts")
    ),
    paths(
        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,

        // Categories
        crate::handlers::categories::list_categories,
        crate::handlers::categories::list_all_categories,
        crate::handlers::categories::get_category,
        crate::handlers::categories::create_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,

        // Suppliers
        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::list_all_suppliers,
        crate::handlers::suppliers::get_supplier,
        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::update_supplier,
        crate::handlers::suppliers::delete_supplier,

        // Inventory
        crate::handlers::inventory::list_stock,
        crate::handlers::inventory::get_stock,
        crate::handlers::inventory::set_stock_quantity,
        crate::handlers::inventory::delete_stock,

        // Promotions
        crate::handlers::promotions::list_promotions,
        crate::handlers::promotions::get_promotion,
        crate::handlers::promotions::create_promotion,
        crate::handlers::promotions::update_promotion,
        crate::handlers::promotions::delete_promotion,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::create_order,
        crate::handlers::orders::quote_cart,
        crate::handlers::orders::pay_order,
        crate::handlers::orders::delete_order,

        // Payments
        crate::handlers::payments::list_payments,
        crate::handlers::payments::get_payment,
        crate::handlers::payments::checkout,
        crate::handlers::payments::delete_payment,

        // Customers
        crate::handlers::customers::list_customers,
        crate::handlers::customers::get_customer,
        crate::handlers::customers::get_customer_orders,
        crate::handlers::customers::create_customer,
        crate::handlers::customers::update_customer,
        crate::handlers::customers::delete_customer,

        // Users
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
    ),
    components(
        schemas(
            // Envelope
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::ResponseMeta,
            crate::errors::ErrorResponse,

            // Entities
            crate::entities::product::Model,
            crate::entities::category::Model,
            crate::entities::supplier::Model,
            crate::entities::inventory_level::Model,
            crate::entities::promotion::Model,
            crate::entities::promotion::DiscountType,
            crate::entities::promotion::PromotionStatus,
            crate::entities::order::Model,
            crate::entities::order::OrderStatus,
            crate::entities::order_item::Model,
            crate::entities::payment::Model,
            crate::entities::payment::PaymentMethod,
            crate::entities::customer::Model,
            crate::entities::user::Model,
            crate::entities::user::UserRole,

            // Catalog
            crate::services::catalog::CreateProductRequest,
            crate::services::catalog::UpdateProductRequest,
            crate::services::catalog::CategoryRequest,
            crate::services::catalog::SupplierRequest,

            // Inventory
            crate::services::inventory::StockLevel,
            crate::handlers::inventory::SetQuantityRequest,

            // Promotions
            crate::services::promotions::CreatePromotionRequest,
            crate::services::promotions::UpdatePromotionRequest,

            // Orders
            crate::services::orders::CartItemRequest,
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::QuoteRequest,
            crate::services::orders::OrderConfirmation,
            crate::services::orders::CartQuote,
            crate::services::orders::OrderLineView,
            crate::services::orders::OrderDetails,
            crate::services::orders::OrderSummary,
            crate::services::orders::OrderSort,

            // Payments
            crate::services::payments::PayOrderRequest,
            crate::services::payments::CheckoutRequest,
            crate::services::payments::CheckoutConfirmation,
            crate::services::payments::PaymentSummary,
            crate::services::payments::PaymentSort,

            // Customers and staff
            crate::services::customers::CustomerRequest,
            crate::services::customers::CustomerSort,
            crate::services::customers::CustomerWithOrders,
            crate::services::users::CreateUserRequest,
            crate::services::users::UpdateUserRequest,
        )
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at /swagger-ui, serving the document from
/// /api-docs/openapi.json.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let document = ApiDoc::openapi();
        let json = serde_json::to_string(&document).expect("document should serialize");
        assert!(json.contains("StoreOps API"));
        assert!(json.contains("/api/v1/orders"));
        assert!(json.contains("/api/v1/checkout"));
    }
}
