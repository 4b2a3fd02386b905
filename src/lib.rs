//! Aggregation and query engine for congestion-zone vehicle entries.
//!
//! Data flows one way: raw CSV rows ([`parser`]) are normalized against an
//! entry-point table ([`normalize`]), filtered ([`filter`]), bucketed by
//! location and time ([`analyzers`]), and scaled for display ([`scale`],
//! [`render`]).

pub mod analyzers;
pub mod config;
pub mod entry_points;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod records;
pub mod render;
pub mod scale;
