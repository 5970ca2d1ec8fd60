//! Execute phases of the routed requests. Each runs on a scheduler worker.

pub mod actions;
pub mod filestate;
pub mod restore;
pub mod state;
