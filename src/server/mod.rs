//! Network surfaces: the WebSocket protocol dispatcher and the HTTP file
//! endpoint
//!
//! Both servers bind to loopback-reachable TCP ports and share the
//! [`ImageStore`](crate::store::ImageStore): the dispatcher publishes
//! screenshots into it, the file server reads them back out.

pub mod dispatch;
pub mod files;

pub use dispatch::Dispatcher;
pub use files::FileServer;
