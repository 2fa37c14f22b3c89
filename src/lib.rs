//! winshot: window screenshot capture and delivery server
//!
//! A desktop automation peer connects over WebSocket, asks what windows are
//! open, and requests screenshots of them; the images come back as HTTP
//! URIs rather than inline payloads. Three moving parts:
//!
//! - [`capture`]: window enumeration, activation, and a per-platform
//!   strategy chain producing constrained PNG bytes
//! - [`store`]: a content-addressed, TTL-swept image store backing the URIs
//! - [`server`]: the WebSocket dispatcher and the single-route HTTP file
//!   endpoint
//!
//! The [`model`] module defines the wire envelope and payload types,
//! [`config`] the `WINSHOT_*` environment surface, and [`error`] the stable
//! error codes clients match on.

pub mod capture;
pub mod config;
pub mod error;
pub mod model;
pub mod server;
pub mod store;
pub mod util;
