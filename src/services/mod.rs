// Order workflow and its collaborators
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod promotions;

// Catalog and people
pub mod catalog;
pub mod customers;
pub mod users;
