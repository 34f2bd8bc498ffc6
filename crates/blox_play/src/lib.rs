//! Movement and collision core for Blox Play worlds.

pub mod config;
pub mod console;
pub mod player;
pub mod projection;
pub mod replay;
pub mod session;
pub mod step;
pub mod world;
