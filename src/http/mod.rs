//! HTTP API layer (behind the `http` feature).
//!
//! Exposes the search and notification services over an axum router with
//! security headers, CORS, fixed-window rate limiting, and JWT auth on the
//! admin routes.

mod auth;
mod server;

pub use auth::{Claims, JwtAuthenticator, JwtConfig};
pub use server::{AppState, RateLimitConfig, router, serve};
