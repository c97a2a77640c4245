//! The (de)serializable messages of the protocol, grouped by direction and session phase.

pub mod broadcasts;
pub mod events;
pub mod hello;
