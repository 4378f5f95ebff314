//! Madden Imperialism - territory conquest over US counties
//!
//! Teams start from home seeds, the map is split by nearest seed, and every
//! battle result after that is an append-only event that can be replayed to
//! any earlier step.

pub mod core;
pub mod game;
pub mod history;
pub mod map;
pub mod persist;
pub mod render;
