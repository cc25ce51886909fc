//! Heirloom - keeps parent issues open while their sub-issues are active.
//!
//! Stale-issue bots judge an issue by its own `updatedAt`. A tracking issue
//! whose work happens in sub-issues looks idle to them even while those
//! sub-issues are busy. This crate walks each parent's sub-issue hierarchy,
//! discounts updates caused by bots, and comments on the parent when a
//! descendant saw genuine activity within the threshold window.

pub mod activity;
pub mod app;
pub mod config;
pub mod credentials;
pub mod effects;
pub mod executor;
pub mod github;
pub mod refresh;
pub mod scan;
pub mod traversal;
pub mod types;

#[cfg(test)]
mod test_utils;
