pub mod ai;
pub mod api;
pub mod chat;
pub mod cli;
pub mod core;
pub mod google;
