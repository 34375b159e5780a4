pub mod confirm;
pub mod coordinator;
pub mod ledger;
pub mod locks;
