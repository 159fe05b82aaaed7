pub mod account;
pub mod credential;
pub mod moderation;
pub mod query;
pub mod registration;
