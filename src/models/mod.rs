pub mod assignment;
pub mod business;
pub mod driver;
pub mod event;
pub mod ledger;
pub mod order;
