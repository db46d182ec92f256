//! Cinedex-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across cinedex:
//!
//! - **Typed IDs**: catalog ids for movies and shows, source ids, and the
//!   deterministic video file id
//! - **Core Types**: backend kinds and entry kinds
//! - **Path Utilities**: video extension detection
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use cinedex_common::{MovieId, SourceId, VideoFileId, Error, Result};
//! use cinedex_common::paths::is_video_file;
//!
//! let source = SourceId::new("nas");
//! let a = VideoFileId::derive(&source, "/movies/Heat.1995.mkv");
//! let b = VideoFileId::derive(&source, "/movies/Heat.1995.mkv");
//! assert_eq!(a, b);
//!
//! assert!(is_video_file("Heat.1995.MKV"));
//!
//! fn example() -> Result<MovieId> {
//!     Err(Error::not_found("movie"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
