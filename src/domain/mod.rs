// Domain layer: models and ports. Concrete broker/bulb clients live in adapters.

pub mod model;
pub mod ports;
