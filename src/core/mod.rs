pub mod clock;
pub mod color_map;
pub mod market_hours;
pub mod monitor;

pub use crate::domain::model::{BulbState, Color, ColorCommand, PnlSnapshot, Position};
pub use crate::domain::ports::{BulbController, Clock, PortfolioClient};
pub use crate::utils::error::Result;
