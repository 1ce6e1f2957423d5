pub mod assignment;
pub mod ledger;
pub mod policy;
pub mod release;
pub mod slots;
