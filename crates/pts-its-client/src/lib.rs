//! # pts-its-client — Authority Transport
//!
//! The engine never talks to the national tracking authority directly; it
//! goes through the [`AuthorityClient`] trait, which abstracts the four
//! operations the compliance workflows need: token acquisition,
//! notification submit, transfer search, and archive download.
//!
//! ## Implementations
//!
//! - [`HttpAuthorityClient`] — production client over reqwest with bearer
//!   token caching, a bounded per-request timeout, and transparent retry
//!   on transient transport failures.
//! - [`ScriptedAuthorityClient`] — in-memory test double with programmable
//!   responses; used by the notification workflow tests.
//!
//! ## Failure Semantics
//!
//! Timeouts and 5xx responses map to retryable errors
//! ([`ItsError::is_retryable`]); the caller's records stay in their last
//! durable state — nothing is ever marked success or fail without an
//! explicit response body saying so.

pub mod client;
pub mod error;
pub mod http;
pub mod mock;
pub mod retry;
pub mod types;

pub use client::AuthorityClient;
pub use error::ItsError;
pub use http::{Credentials, HttpAuthorityClient};
pub use mock::ScriptedAuthorityClient;
pub use types::{DateRange, Token, TransferId};
