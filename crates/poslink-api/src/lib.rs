//! Async client for a retail point-of-sale backend.
//!
//! Two connections to one server:
//!
//! - **Requests** ([`ApiClient`]): JSON over HTTP with bearer-token
//!   injection, bounded retries for transient failures (3 attempts, linear
//!   1s/2s backoff) and response normalization. Endpoint helpers cover
//!   products, categories, suppliers, members, sales, reports and payments.
//!
//! - **Events** ([`EventChannel`]): a Socket.IO session over WebSocket that
//!   reconnects with exponential backoff and republishes server push events
//!   on a [`NotificationBus`].
//!
//! The two halves share nothing but the bus and, optionally, the session
//! token slot ([`SessionToken`]).

pub mod auth;
pub mod bus;
pub mod channel;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod request;
pub mod retry;
pub mod token;
pub mod transport;

pub use auth::LoginResponse;
pub use bus::{Notification, NotificationBus, NotificationKind, Subscription};
pub use channel::{ChannelConfig, ChannelState, EventChannel, ReconnectPolicy};
pub use client::{ApiClient, ClientConfig};
pub use endpoints::{ProductQuery, SortOrder};
pub use error::Error;
pub use request::ApiRequest;
pub use retry::RetryPolicy;
pub use token::{FileTokenStore, MemoryTokenStore, SessionToken, TokenStore};
pub use transport::{TlsMode, TransportConfig};
