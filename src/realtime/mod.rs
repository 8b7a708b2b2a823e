//! Real-time push over WebSocket using a subset of STOMP 1.2.
//!
//! Topics:
//! - `/topic/auth`: login and registration notices
//! - `/topic/active-users`: number of connected sessions
//! - `/topic/inventory`: stock changes, or the full record list on request

pub mod hub;
pub mod session;
pub mod stomp;
pub mod ws;

pub use hub::RealtimeHub;
