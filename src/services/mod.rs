pub mod coupon_service;
pub mod data_client;
pub mod permission_checker;
pub mod trading_api;

pub use coupon_service::*;
pub use data_client::*;
pub use permission_checker::*;
pub use trading_api::*;
