// Adapters layer: concrete clients for the broker (HTTPS) and the bulb (UDP).

pub mod kite;
pub mod wiz;

pub use kite::KiteClient;
pub use wiz::WizBulb;
