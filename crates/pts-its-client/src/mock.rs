//! # Scripted Authority Client
//!
//! In-process [`AuthorityClient`] for tests and local development. Callers
//! script the responses up front; every submitted payload is recorded for
//! later inspection.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;

use crate::client::AuthorityClient;
use crate::error::ItsError;
use crate::types::{DateRange, Token, TransferId};

/// One recorded submit call.
#[derive(Debug, Clone)]
pub struct RecordedSubmit {
    /// Endpoint the payload was posted to.
    pub endpoint: String,
    /// The payload as sent.
    pub payload: Value,
}

#[derive(Default)]
struct Script {
    submit_responses: VecDeque<Result<Value, ItsError>>,
    search_results: VecDeque<Vec<TransferId>>,
    archives: HashMap<TransferId, Vec<u8>>,
    submitted: Vec<RecordedSubmit>,
    fail_token: bool,
}

/// A scriptable [`AuthorityClient`] that never touches the network.
pub struct ScriptedAuthorityClient {
    script: Mutex<Script>,
    max_items_per_call: usize,
}

impl Default for ScriptedAuthorityClient {
    fn default() -> Self {
        Self::new(500)
    }
}

impl ScriptedAuthorityClient {
    /// New client with the given per-call item cap.
    pub fn new(max_items_per_call: usize) -> Self {
        Self {
            script: Mutex::new(Script::default()),
            max_items_per_call,
        }
    }

    /// Queue the response for the next submit call. Responses are consumed
    /// in order; when the queue is empty, submit echoes the payload back.
    pub fn push_submit_response(&self, response: Result<Value, ItsError>) {
        self.script.lock().submit_responses.push_back(response);
    }

    /// Queue the result for the next search call.
    pub fn push_search_result(&self, ids: Vec<TransferId>) {
        self.script.lock().search_results.push_back(ids);
    }

    /// Register the archive bytes returned for a transfer id.
    pub fn set_archive(&self, id: TransferId, bytes: Vec<u8>) {
        self.script.lock().archives.insert(id, bytes);
    }

    /// Make the next token fetch fail with an auth error.
    pub fn fail_next_token(&self) {
        self.script.lock().fail_token = true;
    }

    /// All submits recorded so far, in call order.
    pub fn submitted(&self) -> Vec<RecordedSubmit> {
        self.script.lock().submitted.clone()
    }
}

#[async_trait]
impl AuthorityClient for ScriptedAuthorityClient {
    async fn fetch_token(&self) -> Result<Token, ItsError> {
        let mut script = self.script.lock();
        if script.fail_token {
            script.fail_token = false;
            return Err(ItsError::Auth {
                reason: "scripted token failure".to_string(),
            });
        }
        Ok(Token {
            secret: "scripted-token".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }

    async fn submit(
        &self,
        endpoint: &str,
        payload: &Value,
        _token: &Token,
    ) -> Result<Value, ItsError> {
        let mut script = self.script.lock();
        script.submitted.push(RecordedSubmit {
            endpoint: endpoint.to_string(),
            payload: payload.clone(),
        });
        match script.submit_responses.pop_front() {
            Some(response) => response,
            None => Ok(payload.clone()),
        }
    }

    async fn search(
        &self,
        _range: &DateRange,
        _token: &Token,
    ) -> Result<Vec<TransferId>, ItsError> {
        Ok(self.script.lock().search_results.pop_front().unwrap_or_default())
    }

    async fn fetch_archive(&self, id: &TransferId, _token: &Token) -> Result<Vec<u8>, ItsError> {
        self.script
            .lock()
            .archives
            .get(id)
            .cloned()
            .ok_or_else(|| ItsError::Api {
                endpoint: format!("transfers/{id}/archive"),
                status: 404,
                body: "no such transfer".to_string(),
            })
    }

    fn max_items_per_call(&self) -> usize {
        self.max_items_per_call
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn records_submits_and_replays_scripted_responses() {
        let client = ScriptedAuthorityClient::new(10);
        client.push_submit_response(Ok(json!({"productList": [{"uc": "0"}]})));

        let token = client.fetch_token().await.unwrap();
        let resp = client
            .submit("notify/shipment", &json!({"productList": []}), &token)
            .await
            .unwrap();
        assert_eq!(resp, json!({"productList": [{"uc": "0"}]}));

        let recorded = client.submitted();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].endpoint, "notify/shipment");

        // Queue exhausted: echoes the payload.
        let echo = client
            .submit("notify/shipment", &json!({"a": 1}), &token)
            .await
            .unwrap();
        assert_eq!(echo, json!({"a": 1}));
    }

    #[tokio::test]
    async fn unknown_archive_is_a_404() {
        let client = ScriptedAuthorityClient::default();
        client.set_archive(TransferId::new("TR-1"), b"<x/>".to_vec());
        let token = client.fetch_token().await.unwrap();

        assert_eq!(
            client
                .fetch_archive(&TransferId::new("TR-1"), &token)
                .await
                .unwrap(),
            b"<x/>"
        );
        let err = client
            .fetch_archive(&TransferId::new("TR-2"), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, ItsError::Api { status: 404, .. }));
    }
}
