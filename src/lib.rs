//! Cinedex - personal media library scanner
//!
//! This library crate exposes the core functionality for integration testing.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod ratings;
pub mod scanner;
