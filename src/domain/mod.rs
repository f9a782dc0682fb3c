//! Weather calculation domain
//!
//! Pure calculation functions and the tool catalogue that exposes them over MCP.

pub mod calculations;
pub mod filter;
pub mod tools;
