// Domain layer: entities, filter predicates and the ports adapters implement.
// Nothing here performs IO.

pub mod filter;
pub mod model;
pub mod ports;
