//! Bulk download scenarios: staged search → fetch → persist with progress
//! events and cooperative cancellation, persisting real wire documents.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;
use tokio::sync::mpsc;

use pts_carrier::{parse, CarrierTree};
use pts_integration_tests::SAMPLE_TRANSFER_XML;
use pts_its_client::{DateRange, ScriptedAuthorityClient, TransferId};
use pts_notify::{run_bulk_download, BulkStatus, CancelToken, PersistError, TransferSink};

/// Sink that parses each archive into a carrier tree before storing it, the
/// way the real persistence path does.
#[derive(Default)]
struct ParsingSink {
    trees: Mutex<HashMap<TransferId, CarrierTree>>,
}

#[async_trait::async_trait]
impl TransferSink for ParsingSink {
    async fn already_stored(&self, id: &TransferId) -> bool {
        self.trees.lock().unwrap().contains_key(id)
    }

    async fn store(&self, id: &TransferId, archive: Vec<u8>) -> Result<(), PersistError> {
        let text = String::from_utf8(archive).map_err(|e| PersistError {
            id: id.clone(),
            reason: e.to_string(),
        })?;
        let tree = parse(&text).map_err(|e| PersistError {
            id: id.clone(),
            reason: e.to_string(),
        })?;
        self.trees.lock().unwrap().insert(id.clone(), tree);
        Ok(())
    }
}

fn range() -> DateRange {
    DateRange {
        from: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
        to: NaiveDate::from_ymd_opt(2024, 11, 30).unwrap(),
    }
}

#[tokio::test]
async fn downloaded_archives_parse_into_carrier_trees() {
    let client = ScriptedAuthorityClient::default();
    client.push_search_result(vec![TransferId::new("TR-1"), TransferId::new("TR-2")]);
    client.set_archive(TransferId::new("TR-1"), SAMPLE_TRANSFER_XML.as_bytes().to_vec());
    client.set_archive(TransferId::new("TR-2"), SAMPLE_TRANSFER_XML.as_bytes().to_vec());

    let sink = ParsingSink::default();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let summary = run_bulk_download(&client, &sink, range(), &CancelToken::new(), &tx)
        .await
        .unwrap();
    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.failed, 0);

    let trees = sink.trees.lock().unwrap();
    assert_eq!(trees.get(&TransferId::new("TR-1")).unwrap().unit_count(), 6);

    // searching, one event per item, completed.
    let mut statuses = Vec::new();
    while let Ok(e) = rx.try_recv() {
        statuses.push(e.status);
    }
    assert_eq!(
        statuses,
        vec![
            BulkStatus::Searching,
            BulkStatus::Downloading,
            BulkStatus::Downloading,
            BulkStatus::Completed,
        ]
    );
}

#[tokio::test]
async fn unparseable_archive_fails_that_item_only() {
    let client = ScriptedAuthorityClient::default();
    client.push_search_result(vec![TransferId::new("TR-BAD"), TransferId::new("TR-OK")]);
    client.set_archive(TransferId::new("TR-BAD"), b"not xml at all".to_vec());
    client.set_archive(TransferId::new("TR-OK"), SAMPLE_TRANSFER_XML.as_bytes().to_vec());

    let sink = ParsingSink::default();
    let (tx, _rx) = mpsc::unbounded_channel();

    let summary = run_bulk_download(&client, &sink, range(), &CancelToken::new(), &tx)
        .await
        .unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.downloaded, 1);
    assert!(sink.trees.lock().unwrap().contains_key(&TransferId::new("TR-OK")));
}

#[tokio::test]
async fn second_run_skips_what_the_first_persisted() {
    let client = ScriptedAuthorityClient::default();
    client.push_search_result(vec![TransferId::new("TR-1")]);
    client.push_search_result(vec![TransferId::new("TR-1")]);
    client.set_archive(TransferId::new("TR-1"), SAMPLE_TRANSFER_XML.as_bytes().to_vec());

    let sink = ParsingSink::default();
    let (tx, _rx) = mpsc::unbounded_channel();

    let first = run_bulk_download(&client, &sink, range(), &CancelToken::new(), &tx)
        .await
        .unwrap();
    assert_eq!(first.downloaded, 1);

    let second = run_bulk_download(&client, &sink, range(), &CancelToken::new(), &tx)
        .await
        .unwrap();
    assert_eq!(second.downloaded, 0);
    assert_eq!(second.skipped, 1);
}

#[tokio::test]
async fn cancelled_run_completes_cleanly_mid_list() {
    struct CancellingSink {
        inner: ParsingSink,
        token: CancelToken,
    }

    #[async_trait::async_trait]
    impl TransferSink for CancellingSink {
        async fn already_stored(&self, id: &TransferId) -> bool {
            self.inner.already_stored(id).await
        }

        async fn store(&self, id: &TransferId, archive: Vec<u8>) -> Result<(), PersistError> {
            self.inner.store(id, archive).await?;
            // The operator hits cancel while the first item persists.
            self.token.cancel();
            Ok(())
        }
    }

    let client = ScriptedAuthorityClient::default();
    client.push_search_result(vec![
        TransferId::new("TR-1"),
        TransferId::new("TR-2"),
        TransferId::new("TR-3"),
    ]);
    for id in ["TR-1", "TR-2", "TR-3"] {
        client.set_archive(TransferId::new(id), SAMPLE_TRANSFER_XML.as_bytes().to_vec());
    }

    let token = CancelToken::new();
    let sink = CancellingSink {
        inner: ParsingSink::default(),
        token: token.clone(),
    };
    let (tx, mut rx) = mpsc::unbounded_channel();

    let summary = run_bulk_download(&client, &sink, range(), &token, &tx).await.unwrap();
    // The in-flight item persisted in full; the rest were never fetched.
    assert!(summary.cancelled);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(sink.inner.trees.lock().unwrap().len(), 1);

    let mut last = None;
    while let Ok(e) = rx.try_recv() {
        last = Some(e);
    }
    let last = last.unwrap();
    assert_eq!(last.status, BulkStatus::Completed);
    assert_eq!(last.message.as_deref(), Some("cancelled"));
}
