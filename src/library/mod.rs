pub mod logger;
pub mod observers;
