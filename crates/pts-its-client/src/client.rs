//! # The Authority Client Trait
//!
//! Everything the engine needs from the external tracking authority,
//! behind one object-safe async trait. Implementations must be
//! `Send + Sync` so they can be shared across tasks behind an `Arc`.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ItsError;
use crate::types::{DateRange, Token, TransferId};

/// Abstract transport to the national tracking authority.
#[async_trait]
pub trait AuthorityClient: Send + Sync {
    /// Acquire (or refresh) a bearer token.
    async fn fetch_token(&self) -> Result<Token, ItsError>;

    /// Submit a notification payload to an endpoint, returning the parsed
    /// response body.
    async fn submit(
        &self,
        endpoint: &str,
        payload: &Value,
        token: &Token,
    ) -> Result<Value, ItsError>;

    /// Search for transfer documents addressed to us in a date range.
    async fn search(&self, range: &DateRange, token: &Token)
        -> Result<Vec<TransferId>, ItsError>;

    /// Download the raw archive (wire XML bytes) of one transfer.
    async fn fetch_archive(&self, id: &TransferId, token: &Token) -> Result<Vec<u8>, ItsError>;

    /// Maximum items the authority accepts per submit call; batches are
    /// chunked to this size.
    fn max_items_per_call(&self) -> usize;
}
