// Core services
pub mod archive;
pub mod catalog;
pub mod dashboard;
pub mod documents;
pub mod partners;
pub mod transactions;
pub mod users;
