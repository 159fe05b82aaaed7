pub mod db;
pub mod live;
pub mod mail;
pub mod notify;
pub mod templates;
