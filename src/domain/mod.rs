//! Domain model: pricing, value objects, aggregates and events.
pub mod aggregates;
pub mod events;
pub mod pricing;
pub mod value_objects;
