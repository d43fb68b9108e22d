//! Start/stop time tracker for your terminal. You tell it what you're doing,
//! it remembers when you started, and on stop it files the finished activity
//! under that day. Everything lives in a single local JSON document that can
//! be exported and merged back.
//!

pub mod cli;
pub mod interchange;
pub mod store;
pub mod tracker;
pub mod utils;
