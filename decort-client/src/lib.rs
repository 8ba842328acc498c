//! Decort Client
//!
//! Authenticated API client for the DECORT platform. Requests are form
//! encoded POSTs; responses come back as raw text for the caller to parse.
//! The client owns retry on transient failures and a shared session that
//! re-authenticates once on authorization errors. The raw HTTP transport and
//! the credential exchange are injected capabilities behind traits.

pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod session;
pub mod tasks;
pub mod transport;

pub use client::DecortClient;
pub use config::Config;
pub use error::ClientError;
pub use form::Form;
pub use session::{AccessToken, Authenticator, OauthAuthenticator, Session};
pub use tasks::TaskPoller;
pub use transport::{HttpTransport, Transport, TransportResponse};
