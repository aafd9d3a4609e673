//! Delvekeep - deterministic turn scheduling, bot play and soak testing for a
//! dungeon crawler

pub mod ai;
pub mod core;
pub mod explore;
pub mod harness;
pub mod turn;
pub mod world;
