pub mod phone;
pub mod policy;
pub mod repository;
pub mod types;
