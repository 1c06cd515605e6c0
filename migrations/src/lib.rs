pub use sea_orm_migration::prelude::*;

mod m20260801_000001_create_categories_table;
mod m20260801_000002_create_suppliers_table;
mod m20260801_000003_create_products_table;
mod m20260801_000004_create_inventory_table;
mod m20260801_000005_create_customers_table;
mod m20260801_000006_create_users_table;
mod m20260801_000007_create_promotions_table;
mod m20260801_000008_create_orders_table;
mod m20260801_000009_create_order_items_table;
mod m20260801_000010_create_payments_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260801_000001_create_categories_table::Migration),
            Box::new(m20260801_000002_create_suppliers_table::Migration),
            Box::new(m20260801_000003_create_products_table::Migration),
            Box::new(m20260801_000004_create_inventory_table::Migration),
            Box::new(m20260801_000005_create_customers_table::Migration),
            Box::new(m20260801_000006_create_users_table::Migration),
            Box::new(m20260801_000007_create_promotions_table::Migration),
            Box::new(m20260801_000008_create_orders_table::Migration),
            Box::new(m20260801_000009_create_order_items_table::Migration),
            Box::new(m20260801_000010_create_payments_table::Migration),
        ]
    }
}
