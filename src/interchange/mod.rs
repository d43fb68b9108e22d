//! Moving activities in and out of the tracker as files.
//! The interchange shape is a flat JSON array with RFC 3339 timestamps, so an
//! export can be handed to someone else and imported back without loss.

pub mod export;
pub mod import;
