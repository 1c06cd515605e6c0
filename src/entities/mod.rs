pub mod category;
pub mod customer;
pub mod inventory_level;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod product;
pub mod promotion;
pub mod supplier;
pub mod user;
