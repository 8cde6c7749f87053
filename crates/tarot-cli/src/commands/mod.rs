pub mod auth_cmd;
pub mod cards;
pub mod common;
pub mod completions;
pub mod config;
pub mod invites;
pub mod journal;
pub mod spread;
