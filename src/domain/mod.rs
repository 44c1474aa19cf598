// Domain layer: entities and ports. Adapters live under crate::adapters.

pub mod model;
pub mod ports;
