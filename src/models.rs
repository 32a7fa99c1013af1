pub mod account;
pub mod project;
pub mod store;
