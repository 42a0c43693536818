pub mod config;
pub mod entities;
pub mod error;
pub mod letters;
pub mod level;
pub mod powerups;
pub mod score;
pub mod session;
pub mod snapshot;
pub mod storage;
