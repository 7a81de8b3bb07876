//! # Bulk Transfer Download
//!
//! Depots periodically pull every transfer document addressed to them from
//! the authority: search a date range, then fetch and persist each archive.
//! The run can take minutes, so it is staged, observable, and cancellable.
//!
//! ## Cancellation Contract
//!
//! The [`CancelToken`] is checked immediately before each external call —
//! the search, and each per-item fetch. It is never checked between a
//! fetch and its persist: once bytes are in hand they are written, so a
//! cancelled run leaves no half-persisted item behind.
//!
//! ## Progress
//!
//! One event per item, plus a leading `searching` event and a terminal
//! `completed` or `error` event, delivered over an unbounded channel. A
//! dropped receiver does not stop the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use pts_its_client::{AuthorityClient, DateRange, ItsError, TransferId};

/// Stage of a bulk download run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkStatus {
    /// Searching the authority for transfer ids.
    Searching,
    /// Fetching and persisting items.
    Downloading,
    /// The run finished (including a cancelled run).
    Completed,
    /// The run aborted on an unrecoverable error.
    Error,
}

/// One progress event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkProgress {
    /// Current stage.
    pub status: BulkStatus,
    /// Total items found by the search (0 while searching).
    pub total: usize,
    /// 1-based index of the item just processed.
    pub current: usize,
    /// Items fetched and persisted so far.
    pub downloaded: usize,
    /// Items skipped because they were already stored.
    pub skipped: usize,
    /// Items that failed to fetch or persist.
    pub failed: usize,
    /// Human-readable detail for this event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Final accounting for a run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkSummary {
    /// Items the search returned.
    pub total: usize,
    /// Items fetched and persisted.
    pub downloaded: usize,
    /// Items already stored.
    pub skipped: usize,
    /// Items that failed.
    pub failed: usize,
    /// Whether the run stopped early on cancellation.
    pub cancelled: bool,
}

/// Cooperative cancellation flag, cloneable across tasks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect before the next external call.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Persisting a fetched archive failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to persist transfer {id}: {reason}")]
pub struct PersistError {
    /// The transfer being persisted.
    pub id: TransferId,
    /// What went wrong.
    pub reason: String,
}

/// Where fetched transfer archives go.
#[async_trait]
pub trait TransferSink: Send + Sync {
    /// Whether this transfer is already stored (it will be skipped).
    async fn already_stored(&self, id: &TransferId) -> bool;

    /// Persist one fetched archive.
    async fn store(&self, id: &TransferId, archive: Vec<u8>) -> Result<(), PersistError>;
}

/// Run one bulk download: search the range, then fetch and persist each
/// transfer not already stored.
///
/// Per-item failures are counted and reported but do not stop the run;
/// only token acquisition or search failure aborts it. A timeout on one
/// item leaves that item in its last durable state and moves on.
pub async fn run_bulk_download(
    client: &dyn AuthorityClient,
    sink: &dyn TransferSink,
    range: DateRange,
    cancel: &CancelToken,
    progress: &UnboundedSender<BulkProgress>,
) -> Result<BulkSummary, ItsError> {
    let mut summary = BulkSummary::default();

    emit(progress, event(BulkStatus::Searching, &summary, 0, None));
    if cancel.is_cancelled() {
        summary.cancelled = true;
        emit(progress, completed_event(&summary));
        return Ok(summary);
    }

    let token = match client.fetch_token().await {
        Ok(token) => token,
        Err(err) => {
            emit(progress, error_event(&summary, &err));
            return Err(err);
        }
    };
    let ids = match client.search(&range, &token).await {
        Ok(ids) => ids,
        Err(err) => {
            emit(progress, error_event(&summary, &err));
            return Err(err);
        }
    };
    summary.total = ids.len();
    tracing::info!(total = summary.total, "bulk download search complete");

    for (index, id) in ids.iter().enumerate() {
        let current = index + 1;

        if cancel.is_cancelled() {
            summary.cancelled = true;
            break;
        }

        if sink.already_stored(id).await {
            summary.skipped += 1;
            emit(
                progress,
                event(BulkStatus::Downloading, &summary, current, Some(format!("{id} already stored"))),
            );
            continue;
        }

        // Token may have gone stale over a long run; fetch_token is cheap
        // when it has not.
        let token = match client.fetch_token().await {
            Ok(token) => token,
            Err(err) => {
                emit(progress, error_event(&summary, &err));
                return Err(err);
            }
        };

        match client.fetch_archive(id, &token).await {
            Ok(archive) => match sink.store(id, archive).await {
                Ok(()) => {
                    summary.downloaded += 1;
                    emit(progress, event(BulkStatus::Downloading, &summary, current, None));
                }
                Err(err) => {
                    summary.failed += 1;
                    tracing::warn!(transfer = %id, %err, "persist failed");
                    emit(
                        progress,
                        event(BulkStatus::Downloading, &summary, current, Some(err.to_string())),
                    );
                }
            },
            Err(err) => {
                summary.failed += 1;
                tracing::warn!(transfer = %id, %err, "archive fetch failed");
                emit(
                    progress,
                    event(BulkStatus::Downloading, &summary, current, Some(err.to_string())),
                );
            }
        }
    }

    emit(progress, completed_event(&summary));
    Ok(summary)
}

fn event(
    status: BulkStatus,
    summary: &BulkSummary,
    current: usize,
    message: Option<String>,
) -> BulkProgress {
    BulkProgress {
        status,
        total: summary.total,
        current,
        downloaded: summary.downloaded,
        skipped: summary.skipped,
        failed: summary.failed,
        message,
    }
}

fn completed_event(summary: &BulkSummary) -> BulkProgress {
    let message = summary.cancelled.then(|| "cancelled".to_string());
    event(BulkStatus::Completed, summary, summary.total, message)
}

fn error_event(summary: &BulkSummary, err: &ItsError) -> BulkProgress {
    event(BulkStatus::Error, summary, 0, Some(err.to_string()))
}

fn emit(progress: &UnboundedSender<BulkProgress>, event: BulkProgress) {
    // A dropped receiver means nobody is watching; the run continues.
    let _ = progress.send(event);
}
