//! # Postgres Store
//!
//! [`PgLedgerStore`] persists one tenant's ledger in Postgres. Every
//! mutation follows the same shape:
//!
//! 1. open a transaction,
//! 2. `SELECT ... FOR UPDATE` the line header — the row lock serializes
//!    concurrent mutations of the same line,
//! 3. load the rows, rebuild the [`DocumentLine`], run the pure ledger
//!    logic from `pts-ledger`,
//! 4. write the result back and bump the version, commit.
//!
//! The business rules live in exactly one place that way; this module only
//! moves bytes. Rejections roll the transaction back, so a rejected scan
//! leaves the stored line untouched — the same guarantee the in-memory
//! store gives.
//!
//! Tests for the ledger semantics run against [`InMemoryLedgerStore`];
//! this implementation is exercised against a live database in deployment
//! verification, not in the crate's test suite.
//!
//! [`InMemoryLedgerStore`]: crate::memory::InMemoryLedgerStore

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use pts_core::{
    CarrierLabel, ExpiryDate, Gtin, LineId, LotNumber, SerialNumber, TrackingClass, UnitId,
};
use pts_ledger::{
    DocumentLine, LedgerError, LedgerRow, ReconcileCounts, RemovalRef, ScannedUnit,
};

use crate::error::StoreError;
use crate::store::LedgerStore;

/// Table definitions for the ledger schema.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS document_lines (
    line_id             UUID PRIMARY KEY,
    product             TEXT NOT NULL,
    expected_quantity   BIGINT NOT NULL,
    tracking_class      TEXT NOT NULL,
    version             BIGINT NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS ledger_rows (
    row_id      UUID PRIMARY KEY,
    line_id     UUID NOT NULL REFERENCES document_lines(line_id) ON DELETE CASCADE,
    gtin        TEXT NOT NULL,
    serial      TEXT,
    lot         TEXT,
    expiry      DATE,
    carrier     TEXT,
    quantity    BIGINT NOT NULL,
    captured_at TIMESTAMPTZ NOT NULL,
    captured_by TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ledger_rows_line ON ledger_rows (line_id);
"#;

/// A [`LedgerStore`] over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Connect a pool and wrap it.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the ledger tables if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Lock the line header and rebuild the in-memory line from its rows.
    /// The returned version is what the lock observed.
    async fn load_locked(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: LineId,
    ) -> Result<(DocumentLine, u64), StoreError> {
        let header = sqlx::query(
            "SELECT product, expected_quantity, tracking_class, version \
             FROM document_lines WHERE line_id = $1 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(LedgerError::LineNotFound(id))?;

        let product = Gtin::new(header.try_get::<String, _>("product")?).map_err(corrupt)?;
        let expected_quantity = to_u32(header.try_get::<i64, _>("expected_quantity")?)?;
        let tracking_class =
            TrackingClass::from_str(&header.try_get::<String, _>("tracking_class")?)
                .map_err(corrupt)?;
        let version = to_u64(header.try_get::<i64, _>("version")?)?;

        let rows = sqlx::query(
            "SELECT row_id, gtin, serial, lot, expiry, carrier, quantity, captured_at, \
             captured_by FROM ledger_rows WHERE line_id = $1 ORDER BY captured_at, row_id",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut **tx)
        .await?
        .into_iter()
        .map(decode_row)
        .collect::<Result<Vec<_>, _>>()?;

        Ok((
            DocumentLine {
                line_id: id,
                product,
                expected_quantity,
                tracking_class,
                rows,
            },
            version,
        ))
    }

    /// Replace the stored rows with the line's current rows and advance the
    /// version. Runs inside the caller's transaction, under the row lock.
    async fn write_back(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        line: &DocumentLine,
        new_version: u64,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM ledger_rows WHERE line_id = $1")
            .bind(line.line_id.as_uuid())
            .execute(&mut **tx)
            .await?;
        for row in &line.rows {
            insert_row(tx, line.line_id, row).await?;
        }
        sqlx::query("UPDATE document_lines SET version = $2 WHERE line_id = $1")
            .bind(line.line_id.as_uuid())
            .bind(to_i64(new_version)?)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn insert_line(&self, line: DocumentLine) -> Result<LineId, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO document_lines (line_id, product, expected_quantity, tracking_class, version) \
             VALUES ($1, $2, $3, $4, 0)",
        )
        .bind(line.line_id.as_uuid())
        .bind(line.product.as_str())
        .bind(i64::from(line.expected_quantity))
        .bind(line.tracking_class.as_str())
        .execute(&mut *tx)
        .await?;
        for row in &line.rows {
            insert_row(&mut tx, line.line_id, row).await?;
        }
        tx.commit().await?;
        Ok(line.line_id)
    }

    async fn load_line(&self, id: LineId) -> Result<DocumentLine, StoreError> {
        let mut tx = self.pool.begin().await?;
        let (line, _) = self.load_locked(&mut tx, id).await?;
        tx.commit().await?;
        Ok(line)
    }

    async fn line_version(&self, id: LineId) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT version FROM document_lines WHERE line_id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::LineNotFound(id))?;
        to_u64(row.try_get::<i64, _>("version")?)
    }

    async fn register_scan(&self, id: LineId, unit: ScannedUnit) -> Result<UnitId, StoreError> {
        let mut tx = self.pool.begin().await?;
        let (mut line, version) = self.load_locked(&mut tx, id).await?;
        let row_id = line.register_scan(unit).map_err(LedgerError::from)?;
        self.write_back(&mut tx, &line, version + 1).await?;
        tx.commit().await?;
        Ok(row_id)
    }

    async fn remove_units(&self, id: LineId, refs: &[RemovalRef]) -> Result<u32, StoreError> {
        let mut tx = self.pool.begin().await?;
        let (mut line, version) = self.load_locked(&mut tx, id).await?;
        let removed = line.remove_units(refs);
        if removed > 0 {
            self.write_back(&mut tx, &line, version + 1).await?;
        }
        tx.commit().await?;
        Ok(removed)
    }

    async fn reconcile(
        &self,
        id: LineId,
        based_on_version: u64,
        desired: Vec<LedgerRow>,
    ) -> Result<ReconcileCounts, StoreError> {
        let mut tx = self.pool.begin().await?;
        let (mut line, version) = self.load_locked(&mut tx, id).await?;
        if version != based_on_version {
            return Err(LedgerError::ReconciliationConflict {
                line: id,
                expected: based_on_version,
                found: version,
            }
            .into());
        }
        let counts = line.reconcile(desired).map_err(LedgerError::from)?;
        if !counts.is_noop() {
            self.write_back(&mut tx, &line, version + 1).await?;
        }
        tx.commit().await?;
        Ok(counts)
    }
}

async fn insert_row(
    tx: &mut Transaction<'_, Postgres>,
    line: LineId,
    row: &LedgerRow,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO ledger_rows \
         (row_id, line_id, gtin, serial, lot, expiry, carrier, quantity, captured_at, captured_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(row.row_id.as_uuid())
    .bind(line.as_uuid())
    .bind(row.gtin.as_str())
    .bind(row.serial.as_ref().map(|s| s.as_str()))
    .bind(row.lot.as_ref().map(|l| l.as_str()))
    .bind(row.expiry.map(|e| e.as_date()))
    .bind(row.carrier.as_ref().map(|c| c.as_str()))
    .bind(i64::from(row.quantity))
    .bind(row.captured_at)
    .bind(row.captured_by.as_str())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn decode_row(row: PgRow) -> Result<LedgerRow, StoreError> {
    let serial = row
        .try_get::<Option<String>, _>("serial")?
        .map(SerialNumber::new)
        .transpose()
        .map_err(corrupt)?;
    let lot = row
        .try_get::<Option<String>, _>("lot")?
        .map(LotNumber::new)
        .transpose()
        .map_err(corrupt)?;
    let carrier = row
        .try_get::<Option<String>, _>("carrier")?
        .map(CarrierLabel::new)
        .transpose()
        .map_err(corrupt)?;
    Ok(LedgerRow {
        row_id: UnitId::from_uuid(row.try_get::<Uuid, _>("row_id")?),
        gtin: Gtin::new(row.try_get::<String, _>("gtin")?).map_err(corrupt)?,
        serial,
        lot,
        expiry: row
            .try_get::<Option<NaiveDate>, _>("expiry")?
            .map(ExpiryDate::from_date),
        carrier,
        quantity: to_u32(row.try_get::<i64, _>("quantity")?)?,
        captured_at: row.try_get::<DateTime<Utc>, _>("captured_at")?,
        captured_by: row.try_get::<String, _>("captured_by")?,
    })
}

fn corrupt(err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupted {
        reason: err.to_string(),
    }
}

fn to_u32(value: i64) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| corrupt(format!("quantity {value} out of range")))
}

fn to_u64(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| corrupt(format!("version {value} out of range")))
}

fn to_i64(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| corrupt(format!("version {value} out of range")))
}
