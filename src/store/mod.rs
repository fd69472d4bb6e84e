pub mod catalog;
pub mod lock;
