/// State management module
///
/// This module handles all application state, including:
/// - The access lifecycle state machine (access.rs)
/// - Grant and reading-position persistence (store.rs)
/// - Shared data structures (data.rs)

pub mod access;
pub mod data;
pub mod store;
