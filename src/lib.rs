pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod game;
pub mod models;
pub mod net;
pub mod services;
pub mod state;

// Convenient re-exports (so call sites can do `orbis::Registry`, etc.)
pub use commands::process_frame;
pub use game::GameEvent;
pub use state::{
    pool::SlotId,
    registry::{Registry, Repos},
};
