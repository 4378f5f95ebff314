//! Save and load of game state

pub mod save;

pub use save::{load, open_game, save, write_atomic, SaveFile, SAVE_VERSION};
