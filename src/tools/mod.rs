//! Tools module
//!
//! MCP tool implementations. Each function returns `Result<_, String>` and the
//! server turns errors into MCP error responses.

pub mod benchmarks;
pub mod evaluations;
pub mod nutrition;
pub mod reports;
pub mod status;
