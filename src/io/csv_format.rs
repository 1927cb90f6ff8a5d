//! CSV row format of the spreadsheet
//!
//! This module centralizes the sheet layout, providing:
//! - SheetRow structure for (de)serialization
//! - Conversion between rows and domain transactions
//!
//! Columns: `id, kind, amount, currency, category, timestamp, note, status,
//! payment_method`. One row per transaction version; for a given id the
//! last row wins.
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{Currency, PaymentMethod, Transaction, TransactionKind, TransactionStatus};
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Column names, in order
pub const SHEET_HEADER: [&str; 9] = [
    "id",
    "kind",
    "amount",
    "currency",
    "category",
    "timestamp",
    "note",
    "status",
    "payment_method",
];

/// One sheet row, all fields as text
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SheetRow {
    pub id: String,
    pub kind: String,
    pub amount: String,
    pub currency: String,
    pub category: String,
    /// Transaction date, `YYYY-MM-DD` (a full RFC 3339 timestamp is accepted)
    pub timestamp: String,
    pub note: Option<String>,
    pub status: String,
    pub payment_method: Option<String>,
}

impl SheetRow {
    pub fn from_transaction(transaction: &Transaction) -> Self {
        SheetRow {
            id: transaction.id.to_string(),
            kind: transaction.kind.as_str().to_string(),
            amount: transaction.amount.to_string(),
            currency: transaction.currency.code().to_string(),
            category: transaction.category.clone(),
            timestamp: transaction.date.format("%Y-%m-%d").to_string(),
            note: transaction.note.clone(),
            status: transaction.status.as_str().to_string(),
            payment_method: transaction.payment_method.map(|m| m.as_str().to_string()),
        }
    }
}

/// Convert a SheetRow to a Transaction
///
/// This function:
/// - Parses the id, kind, status, currency and payment method
/// - Parses the amount, which must be positive
/// - Reads the date from the timestamp column
///
/// # Arguments
///
/// * `row` - The deserialized sheet row
///
/// # Returns
///
/// Result containing either:
/// - Ok(Transaction) - Successfully converted row
/// - Err(String) - Error message describing the conversion failure
pub fn convert_sheet_row(row: SheetRow) -> Result<Transaction, String> {
    let id = row
        .id
        .parse()
        .map_err(|_| format!("Invalid transaction id '{}'", row.id))?;
    let kind = TransactionKind::from_str(&row.kind)?;
    let status = TransactionStatus::from_str(&row.status)?;
    let currency = Currency::from_str(&row.currency)?;

    let amount = Decimal::from_str(row.amount.trim())
        .map_err(|_| format!("Invalid amount '{}' for transaction {}", row.amount, row.id))?;
    if amount <= Decimal::ZERO {
        return Err(format!(
            "Amount must be positive, got {} for transaction {}",
            amount, row.id
        ));
    }

    let date = parse_timestamp(&row.timestamp)
        .ok_or_else(|| format!("Invalid timestamp '{}' for transaction {}", row.timestamp, row.id))?;

    let payment_method = match row.payment_method.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(method) => Some(PaymentMethod::from_str(method)?),
    };
    let note = row.note.filter(|note| !note.trim().is_empty());

    let category = row.category.trim();
    if category.is_empty() {
        return Err(format!("Missing category for transaction {}", row.id));
    }

    Ok(Transaction {
        id,
        kind,
        amount,
        currency,
        category: category.to_string(),
        date,
        note,
        payment_method,
        status,
    })
}

fn parse_timestamp(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionId;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn row() -> SheetRow {
        SheetRow {
            id: "a1b2c3d4-0000-4000-8000-000000000001".to_string(),
            kind: "expense".to_string(),
            amount: "45.90".to_string(),
            currency: "BRL".to_string(),
            category: "transporte".to_string(),
            timestamp: "2025-05-03".to_string(),
            note: Some("uber".to_string()),
            status: "committed".to_string(),
            payment_method: Some("pix".to_string()),
        }
    }

    #[test]
    fn test_convert_valid_row() {
        let tx = convert_sheet_row(row()).unwrap();
        assert_eq!(tx.id.to_string(), "a1b2c3d4-0000-4000-8000-000000000001");
        assert_eq!(tx.kind, TransactionKind::Expense);
        assert_eq!(tx.amount, dec!(45.90));
        assert_eq!(tx.currency, Currency::Brl);
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2025, 5, 3).unwrap());
        assert_eq!(tx.note.as_deref(), Some("uber"));
        assert_eq!(tx.status, TransactionStatus::Committed);
        assert_eq!(tx.payment_method, Some(PaymentMethod::Pix));
    }

    #[test]
    fn test_row_from_transaction_matches_columns() {
        let tx = convert_sheet_row(row()).unwrap();
        assert_eq!(SheetRow::from_transaction(&tx), row());
    }

    #[test]
    fn test_rfc3339_timestamp_and_empty_optionals() {
        let mut row = row();
        row.timestamp = "2025-05-03T14:30:00-03:00".to_string();
        row.note = Some("  ".to_string());
        row.payment_method = None;

        let tx = convert_sheet_row(row).unwrap();
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2025, 5, 3).unwrap());
        assert_eq!(tx.note, None);
        assert_eq!(tx.payment_method, None);
    }

    #[rstest]
    #[case::bad_id(SheetRow { id: "x".to_string(), ..row() }, "Invalid transaction id")]
    #[case::bad_kind(SheetRow { kind: "transfer".to_string(), ..row() }, "invalid transaction kind")]
    #[case::bad_status(SheetRow { status: "done".to_string(), ..row() }, "invalid transaction status")]
    #[case::bad_currency(SheetRow { currency: "XYZ".to_string(), ..row() }, "unsupported currency")]
    #[case::bad_amount(SheetRow { amount: "abc".to_string(), ..row() }, "Invalid amount")]
    #[case::zero_amount(SheetRow { amount: "0".to_string(), ..row() }, "must be positive")]
    #[case::bad_timestamp(SheetRow { timestamp: "03/05".to_string(), ..row() }, "Invalid timestamp")]
    #[case::bad_method(SheetRow { payment_method: Some("cheque".to_string()), ..row() }, "invalid payment method")]
    #[case::no_category(SheetRow { category: " ".to_string(), ..row() }, "Missing category")]
    fn test_convert_errors(#[case] row: SheetRow, #[case] expected: &str) {
        let error = convert_sheet_row(row).unwrap_err();
        assert!(error.contains(expected), "{error}");
    }

    #[test]
    fn test_header_matches_serialized_fields() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let tx = Transaction {
            id: TransactionId::new(),
            ..convert_sheet_row(row()).unwrap()
        };
        writer.serialize(SheetRow::from_transaction(&tx)).unwrap();
        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let header = output.lines().next().unwrap();
        assert_eq!(header, SHEET_HEADER.join(","));
    }
}
