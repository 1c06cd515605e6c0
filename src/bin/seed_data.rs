//! Seed tool - fills an empty database with demo data for local exploration
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - 5 categories and 3 suppliers
//! - 12 barcoded products with stock on hand
//! - 5 customers, 2 staff accounts and 3 promo codes
//!
//! The tool is idempotent in the cheapest way possible: if the database
//! already holds products it refuses to insert anything.

use chrono::{Duration, Utc};
use clap::Parser;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, NotSet, PaginatorTrait, Set};
use tracing::info;

use storeops_api::db::{self, DbPool};
use storeops_api::entities::{
    category, customer, inventory_level, product,
    promotion::{self, DiscountType, PromotionStatus},
    supplier,
    user::{self, UserRole},
};
use storeops_api::services::users::hash_password;

#[derive(Parser, Debug)]
#[command(name = "seed-data", about = "Populate the StoreOps database with demo data")]
struct Args {
    /// Connection string; falls back to DATABASE_URL, then a local SQLite file.
    #[arg(long)]
    database_url: Option<String>,

    /// Do not run pending migrations before inserting rows.
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let database_url = args
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite://storeops.db?mode=rwc".to_string());

    info!("=== StoreOps seed data ===");
    info!("Connecting to database: {}", database_url);
    let db = db::establish_connection(&database_url).await?;

    if !args.skip_migrations {
        db::run_migrations(&db).await?;
    }

    let existing = product::Entity::find().count(&db).await?;
    if existing > 0 {
        info!(
            "Database already holds {} products; refusing to seed twice.",
            existing
        );
        return Ok(());
    }

    info!("Creating categories...");
    let categories = create_categories(&db).await?;
    info!("  Created {} categories", categories.len());

    info!("Creating suppliers...");
    let suppliers = create_suppliers(&db).await?;
    info!("  Created {} suppliers", suppliers.len());

    info!("Creating products...");
    let products = create_products(&db, &categories, &suppliers).await?;
    info!("  Created {} products", products.len());

    info!("Creating inventory...");
    let stocked = create_inventory(&db, &products).await?;
    info!("  Stocked {} products", stocked);

    info!("Creating customers...");
    let customer_count = create_customers(&db).await?;
    info!("  Created {} customers", customer_count);

    info!("Creating staff accounts...");
    let user_count = create_users(&db).await?;
    info!("  Created {} accounts", user_count);

    info!("Creating promotions...");
    let promo_count = create_promotions(&db).await?;
    info!("  Created {} promo codes", promo_count);

    info!("");
    info!("=== Seed complete ===");
    info!("Staff accounts (change these passwords):");
    info!("  admin / change-me-admin");
    info!("  cashier1 / change-me-cashier");
    info!("");
    info!("Try these API calls:");
    info!("  curl http://localhost:8080/api/v1/products");
    info!("  curl http://localhost:8080/api/v1/inventory");
    info!("  curl http://localhost:8080/api/v1/promotions");
    info!("  curl -X POST http://localhost:8080/api/v1/orders \\");
    info!("       -H 'Content-Type: application/json' \\");
    info!(
        "       -d '{{\"cart_items\":[{{\"product_id\":1,\"quantity\":2}}],\"promo_code\":\"WELCOME10\"}}'"
    );
    info!("");
    info!("Or explore interactively at: http://localhost:8080/swagger-ui");

    Ok(())
}

async fn create_categories(db: &DbPool) -> anyhow::Result<Vec<category::Model>> {
    let names = [
        "Beverages",
        "Snacks",
        "Dairy",
        "Household",
        "Personal Care",
    ];

    let mut created = Vec::new();
    for name in names {
        let row = category::ActiveModel {
            category_id: NotSet,
            category_name: Set(name.to_string()),
        };
        created.push(row.insert(db).await?);
    }
    Ok(created)
}

async fn create_suppliers(db: &DbPool) -> anyhow::Result<Vec<supplier::Model>> {
    let suppliers_data = [
        (
            "Saigon Beverage Distribution",
            "+84-28-3822-4455",
            "sales@sgbeverage.example.com",
            "14 Nguyen Hue, District 1, Ho Chi Minh City",
        ),
        (
            "Mekong Foods Co.",
            "+84-292-3731-900",
            "orders@mekongfoods.example.com",
            "88 Tran Phu, Ninh Kieu, Can Tho",
        ),
        (
            "Hanoi Home Supplies",
            "+84-24-3974-1122",
            "contact@hanoihome.example.com",
            "210 Pho Hue, Hai Ba Trung, Hanoi",
        ),
    ];

    let mut created = Vec::new();
    for (name, phone, email, address) in suppliers_data {
        let row = supplier::ActiveModel {
            supplier_id: NotSet,
            name: Set(name.to_string()),
            phone: Set(Some(phone.to_string())),
            email: Set(Some(email.to_string())),
            address: Set(Some(address.to_string())),
        };
        created.push(row.insert(db).await?);
    }
    Ok(created)
}

/// Returns each created product together with its opening stock quantity.
async fn create_products(
    db: &DbPool,
    categories: &[category::Model],
    suppliers: &[supplier::Model],
) -> anyhow::Result<Vec<(product::Model, i32)>> {
    // (name, barcode, price, unit, category idx, supplier idx, opening stock)
    let products_data = [
        ("Mineral Water 500ml", "8934588012345", dec!(6000), "bottle", 0, 0, 240),
        ("Green Tea 450ml", "8934588023456", dec!(10000), "bottle", 0, 0, 180),
        ("Ground Coffee 250g", "8935024112233", dec!(58000), "bag", 0, 0, 60),
        ("Potato Chips 95g", "8936036621017", dec!(18000), "bag", 1, 1, 120),
        ("Chocolate Wafer 110g", "8936036634561", dec!(22000), "box", 1, 1, 90),
        ("Instant Noodles x10", "8934563198765", dec!(42000), "pack", 1, 1, 150),
        ("Fresh Milk 1L", "8934673312457", dec!(32000), "carton", 2, 1, 75),
        ("Yogurt 4x100g", "8934673398761", dec!(28000), "pack", 2, 1, 64),
        ("Dish Soap 750ml", "8934868166829", dec!(35000), "bottle", 3, 2, 48),
        ("Laundry Detergent 3.8L", "8934868177253", dec!(185000), "bottle", 3, 2, 30),
        ("Toothpaste 200g", "8935049510123", dec!(39000), "tube", 4, 2, 55),
        ("Shampoo 650ml", "8935049523458", dec!(96000), "bottle", 4, 2, 40),
    ];

    let now = Utc::now();
    let mut created = Vec::new();

    for (name, barcode, price, unit, cat_idx, sup_idx, stock) in products_data {
        let row = product::ActiveModel {
            product_id: NotSet,
            category_id: Set(Some(categories[cat_idx].category_id)),
            supplier_id: Set(Some(suppliers[sup_idx].supplier_id)),
            product_name: Set(name.to_string()),
            barcode: Set(Some(barcode.to_string())),
            price: Set(price),
            unit: Set(unit.to_string()),
            created_at: Set(now),
        };
        created.push((row.insert(db).await?, stock));
    }

    Ok(created)
}

async fn create_inventory(
    db: &DbPool,
    products: &[(product::Model, i32)],
) -> anyhow::Result<usize> {
    let now = Utc::now();
    for (product, quantity) in products {
        let row = inventory_level::ActiveModel {
            inventory_id: NotSet,
            product_id: Set(product.product_id),
            quantity: Set(*quantity),
            updated_at: Set(now),
        };
        row.insert(db).await?;
    }
    Ok(products.len())
}

async fn create_customers(db: &DbPool) -> anyhow::Result<usize> {
    let customers_data = [
        (
            "Tran Thi Mai",
            Some("+84-90-123-4567"),
            Some("mai.tran@example.com"),
            Some("12 Ly Thuong Kiet, Hanoi"),
        ),
        (
            "Nguyen Van An",
            Some("+84-91-234-5678"),
            Some("an.nguyen@example.com"),
            Some("45 Le Loi, Da Nang"),
        ),
        ("Le Hoang Phuc", None, Some("phuc.le@example.com"), None),
        (
            "Pham Thu Ha",
            Some("+84-93-456-7890"),
            None,
            Some("7 Nguyen Trai, Ho Chi Minh City"),
        ),
        (
            "Vo Minh Khoa",
            Some("+84-94-567-8901"),
            Some("khoa.vo@example.com"),
            Some("23 Hai Ba Trung, Hue"),
        ),
    ];

    let now = Utc::now();
    let mut count = 0;

    for (name, phone, email, address) in customers_data {
        let row = customer::ActiveModel {
            customer_id: NotSet,
            name: Set(name.to_string()),
            phone: Set(phone.map(str::to_string)),
            email: Set(email.map(str::to_string)),
            address: Set(address.map(str::to_string)),
            created_at: Set(now),
        };
        row.insert(db).await?;
        count += 1;
    }

    Ok(count)
}

async fn create_users(db: &DbPool) -> anyhow::Result<usize> {
    let users_data = [
        ("admin", "change-me-admin", "Store Administrator", UserRole::Admin),
        ("cashier1", "change-me-cashier", "Front Desk Cashier", UserRole::Staff),
    ];

    let now = Utc::now();
    let mut count = 0;

    for (username, password, full_name, role) in users_data {
        let row = user::ActiveModel {
            user_id: NotSet,
            username: Set(username.to_string()),
            password_hash: Set(hash_password(password)?),
            full_name: Set(Some(full_name.to_string())),
            role: Set(role),
            created_at: Set(now),
        };
        row.insert(db).await?;
        count += 1;
    }

    Ok(count)
}

async fn create_promotions(db: &DbPool) -> anyhow::Result<usize> {
    let today = Utc::now().date_naive();

    // (code, description, type, value, min order, window, usage limit, status)
    let promotions_data = [
        (
            "WELCOME10",
            "10% off orders of 100,000 or more",
            DiscountType::Percent,
            dec!(10),
            dec!(100000),
            (today - Duration::days(30), today + Duration::days(60)),
            100,
            PromotionStatus::Active,
        ),
        (
            "TET50K",
            "50,000 off orders of 500,000 or more",
            DiscountType::Fixed,
            dec!(50000),
            dec!(500000),
            (today - Duration::days(7), today + Duration::days(21)),
            0,
            PromotionStatus::Active,
        ),
        (
            "CLEARANCE20",
            "20% off, last season's campaign",
            DiscountType::Percent,
            dec!(20),
            dec!(0),
            (today - Duration::days(90), today - Duration::days(30)),
            0,
            PromotionStatus::Inactive,
        ),
    ];

    let mut count = 0;
    for (code, description, discount_type, value, min_order, (start, end), limit, status) in
        promotions_data
    {
        let row = promotion::ActiveModel {
            promo_id: NotSet,
            promo_code: Set(code.to_string()),
            description: Set(Some(description.to_string())),
            discount_type: Set(discount_type),
            discount_value: Set(value),
            start_date: Set(start),
            end_date: Set(end),
            min_order_amount: Set(min_order),
            usage_limit: Set(limit),
            used_count: Set(0),
            status: Set(status),
        };
        row.insert(db).await?;
        count += 1;
    }

    Ok(count)
}
