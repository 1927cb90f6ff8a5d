//! CSV-backed spreadsheet store
//!
//! One file per account (`{dir}/{account}.csv`), append-only, header on the
//! first line. A row's cursor is its 1-based data row number, so
//! `pull_since(cursor)` skips the first `cursor` rows.
//!
//! # Design
//!
//! - Appends are serialized with the `csv` writer and written through
//!   `tokio::fs` in a single `write_all`
//! - Reads stream through csv-async over a tokio file (`compat` layer)
//! - Malformed rows still occupy a cursor position; they are logged and
//!   skipped on pull

use crate::io::csv_format::{convert_sheet_row, SheetRow, SHEET_HEADER};
use crate::sync::{Ack, SpreadsheetStore};
use crate::types::{AccountId, RemoteChange, SyncCursor, SyncError, Transaction};
use async_trait::async_trait;
use csv_async::AsyncReaderBuilder;
use futures::stream::StreamExt;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct CsvSheet {
    dir: PathBuf,
    /// Data rows per account file, loaded on first push
    row_counts: Mutex<HashMap<AccountId, u64>>,
}

impl CsvSheet {
    /// Open (and create if needed) a sheet directory
    ///
    /// # Errors
    ///
    /// `SyncError::Unreachable` if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            row_counts: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of an account's sheet file
    pub fn path(&self, account: AccountId) -> PathBuf {
        self.dir.join(format!("{account}.csv"))
    }
}

#[async_trait]
impl SpreadsheetStore for CsvSheet {
    async fn push(&self, account: AccountId, transaction: &Transaction) -> Result<Ack, SyncError> {
        let mut counts = self.row_counts.lock().await;
        let path = self.path(account);

        let rows = match counts.get(&account) {
            Some(&rows) => rows,
            None => read_rows(&path).await?.len() as u64,
        };

        let mut payload = Vec::new();
        if rows == 0 && !file_has_content(&path).await? {
            payload.extend_from_slice(SHEET_HEADER.join(",").as_bytes());
            payload.push(b'\n');
        }
        payload.extend_from_slice(&encode_row(&SheetRow::from_transaction(transaction))?);

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&payload).await?;
        file.flush().await?;

        let rows = rows + 1;
        counts.insert(account, rows);
        debug!(account, tx = %transaction.id, row = rows, "Row appended");

        Ok(Ack {
            cursor: SyncCursor::new(rows),
        })
    }

    async fn pull_since(
        &self,
        account: AccountId,
        cursor: SyncCursor,
    ) -> Result<Vec<RemoteChange>, SyncError> {
        // Holding the lock keeps a concurrent append from being read half-written
        let _counts = self.row_counts.lock().await;
        let rows = read_rows(&self.path(account)).await?;

        let mut changes = Vec::new();
        for (index, row) in rows.into_iter().enumerate().skip(cursor.position() as usize) {
            let line = index as u64 + 2;
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(account, line, error = %e, "Skipping unreadable sheet row");
                    continue;
                }
            };
            match convert_sheet_row(row) {
                Ok(transaction) => changes.push(RemoteChange {
                    cursor: SyncCursor::new(index as u64 + 1),
                    transaction,
                }),
                Err(e) => warn!(account, line, error = %e, "Skipping malformed sheet row"),
            }
        }

        Ok(changes)
    }
}

/// Every data row of a sheet file, unparsed rows included as errors
///
/// A missing file has no rows.
async fn read_rows(path: &Path) -> Result<Vec<Result<SheetRow, csv_async::Error>>, SyncError> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
    let mut reader = AsyncReaderBuilder::new()
        .flexible(true)
        .trim(csv_async::Trim::All)
        .create_deserializer(compat_file);

    let mut rows = Vec::new();
    let mut records = reader.deserialize::<SheetRow>();
    while let Some(row) = records.next().await {
        rows.push(row);
    }
    Ok(rows)
}

async fn file_has_content(path: &Path) -> Result<bool, SyncError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.len() > 0),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn encode_row(row: &SheetRow) -> Result<Vec<u8>, SyncError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.serialize(row)?;
    writer
        .into_inner()
        .map_err(|e| SyncError::rejected(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Currency, PaymentMethod, TransactionId, TransactionKind, TransactionStatus};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn tx(note: Option<&str>) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            kind: TransactionKind::Expense,
            amount: dec!(45.90),
            currency: Currency::Brl,
            category: "transporte".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 5, 3).unwrap(),
            note: note.map(str::to_string),
            payment_method: Some(PaymentMethod::Pix),
            status: TransactionStatus::Committed,
        }
    }

    #[tokio::test]
    async fn test_push_writes_header_and_rows() {
        let dir = tempdir().unwrap();
        let sheet = CsvSheet::open(dir.path()).await.unwrap();

        let first = sheet.push(3, &tx(Some("uber, centro"))).await.unwrap();
        let second = sheet.push(3, &tx(None)).await.unwrap();
        assert_eq!(first.cursor, SyncCursor::new(1));
        assert_eq!(second.cursor, SyncCursor::new(2));

        let content = std::fs::read_to_string(sheet.path(3)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], SHEET_HEADER.join(","));
        assert!(lines[1].contains("\"uber, centro\""));
    }

    #[tokio::test]
    async fn test_pull_since_returns_rows_after_cursor() {
        let dir = tempdir().unwrap();
        let sheet = CsvSheet::open(dir.path()).await.unwrap();
        let written: Vec<Transaction> = (0..3).map(|_| tx(Some("uber"))).collect();
        for transaction in &written {
            sheet.push(1, transaction).await.unwrap();
        }

        let all = sheet.pull_since(1, SyncCursor::START).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].transaction, written[0]);

        let tail = sheet.pull_since(1, SyncCursor::new(2)).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].cursor, SyncCursor::new(3));
        assert_eq!(tail[0].transaction.id, written[2].id);
    }

    #[tokio::test]
    async fn test_pull_missing_account_is_empty() {
        let dir = tempdir().unwrap();
        let sheet = CsvSheet::open(dir.path()).await.unwrap();
        assert!(sheet.pull_since(9, SyncCursor::START).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped_but_keep_position() {
        let dir = tempdir().unwrap();
        let sheet = CsvSheet::open(dir.path()).await.unwrap();
        let good = tx(None);
        let content = format!(
            "{}\nnot-an-id,expense,1,BRL,lazer,2025-05-01,,committed,\n{}",
            SHEET_HEADER.join(","),
            String::from_utf8(encode_row(&SheetRow::from_transaction(&good)).unwrap()).unwrap()
        );
        std::fs::write(sheet.path(4), content).unwrap();

        let changes = sheet.pull_since(4, SyncCursor::START).await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].cursor, SyncCursor::new(2));
        assert_eq!(changes[0].transaction, good);

        // A reopened sheet keeps counting after existing rows
        let reopened = CsvSheet::open(dir.path()).await.unwrap();
        let ack = reopened.push(4, &tx(None)).await.unwrap();
        assert_eq!(ack.cursor, SyncCursor::new(3));
    }
}
