pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::{KiteClient, WizBulb};
pub use crate::config::{CliArgs, MonitorConfig};
/// 可手動設定時間的時鐘，供測試與模擬非交易時段使用
pub use crate::core::clock::FixedClock;
pub use crate::core::{
    clock::SystemClock,
    color_map::ColorMap,
    market_hours::MarketHours,
    monitor::Monitor,
};
pub use crate::utils::error::{MonitorError, Result};
