//! Balance snapshot extraction from transaction exports.
//!
//! An export file is named `Transactions_<msisdn>.csv` and contains the
//! agent's transaction history, newest first. Only the first data row
//! matters here: its `Date` and `Balance` columns are the agent's latest
//! balance snapshot. Files arrive as UTF-8 but some upstream systems
//! still emit Latin-1, so decoding falls back accordingly.

use std::path::Path;

use thiserror::Error;

/// The latest known balance for one agent wallet.
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceSnapshot {
    /// Agent wallet number, taken from the export filename.
    pub msisdn: String,
    /// Timestamp of the newest transaction, as written by the upstream
    /// system (kept verbatim; formats vary across providers).
    pub captured_at: String,
    /// Wallet balance after the newest transaction, in FCFA.
    pub balance: f64,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("not a transaction export: {0}")]
    NotATransactionFile(String),

    #[error("export {0} has no data rows")]
    EmptyFile(String),

    #[error("export {file} is missing the '{column}' column (headers: {found:?})")]
    MissingColumn {
        file: String,
        column: String,
        found: Vec<String>,
    },

    #[error("export {file} has an unparseable balance '{value}'")]
    InvalidBalance { file: String, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Extract the MSISDN from an export filename.
///
/// Only `Transactions_<digits>.csv` qualifies; anything else in the inbox
/// (reports, partial downloads, stray spreadsheets) is ignored upstream.
pub fn msisdn_from_filename(name: &str) -> Option<String> {
    let stem = name.strip_prefix("Transactions_")?.strip_suffix(".csv")?;
    if !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit()) {
        Some(stem.to_string())
    } else {
        None
    }
}

/// Parse a snapshot out of raw export bytes.
///
/// The filename supplies the MSISDN; the first data row supplies the
/// timestamp and balance. An empty balance cell is treated as 0 (agents
/// that have never transacted export a blank), a malformed one is an
/// error.
pub fn snapshot_from_bytes(filename: &str, bytes: &[u8]) -> Result<BalanceSnapshot, IngestError> {
    let msisdn = msisdn_from_filename(filename)
        .ok_or_else(|| IngestError::NotATransactionFile(filename.to_string()))?;

    let text = decode_export(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let date_idx = column_index(&headers, "Date").ok_or_else(|| IngestError::MissingColumn {
        file: filename.to_string(),
        column: "Date".to_string(),
        found: headers.iter().map(|h| h.to_string()).collect(),
    })?;
    let balance_idx =
        column_index(&headers, "Balance").ok_or_else(|| IngestError::MissingColumn {
            file: filename.to_string(),
            column: "Balance".to_string(),
            found: headers.iter().map(|h| h.to_string()).collect(),
        })?;

    let first = match reader.records().next() {
        Some(record) => record?,
        None => return Err(IngestError::EmptyFile(filename.to_string())),
    };

    let captured_at = first.get(date_idx).unwrap_or("").to_string();
    let raw_balance = first.get(balance_idx).unwrap_or("").trim();
    let balance = if raw_balance.is_empty() {
        0.0
    } else {
        raw_balance
            .parse::<f64>()
            .map_err(|_| IngestError::InvalidBalance {
                file: filename.to_string(),
                value: raw_balance.to_string(),
            })?
    };

    Ok(BalanceSnapshot {
        msisdn,
        captured_at,
        balance,
    })
}

/// Read a snapshot from an export file on disk.
pub fn read_snapshot(path: &Path) -> Result<BalanceSnapshot, IngestError> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .ok_or_else(|| IngestError::NotATransactionFile(path.display().to_string()))?;
    let bytes = std::fs::read(path)?;
    snapshot_from_bytes(&filename, &bytes)
}

/// Find a header column by exact name.
fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// Decode export bytes: UTF-8 first, Latin-1 when that fails.
///
/// Latin-1 maps each byte to the code point of the same value, so the
/// fallback never fails.
fn decode_export(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
Id,Date,Status,Amount,Balance,Currency
12345,2026-01-01 12:00:00,Successful,100,50000,XAF
12344,2025-12-31 09:30:00,Successful,-2500,49900,XAF
";

    #[test]
    fn filename_contract_accepts_digits_only() {
        assert_eq!(
            msisdn_from_filename("Transactions_699112233.csv"),
            Some("699112233".to_string())
        );
        assert_eq!(msisdn_from_filename("Transactions_.csv"), None);
        assert_eq!(msisdn_from_filename("Transactions_abc.csv"), None);
        assert_eq!(msisdn_from_filename("Transactions_699112233.xlsx"), None);
        assert_eq!(msisdn_from_filename("report.csv"), None);
    }

    #[test]
    fn snapshot_takes_first_data_row() {
        let snap = snapshot_from_bytes("Transactions_699112233.csv", EXPORT.as_bytes()).unwrap();
        assert_eq!(snap.msisdn, "699112233");
        assert_eq!(snap.captured_at, "2026-01-01 12:00:00");
        assert!((snap.balance - 50000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_file_is_rejected() {
        let data = "Id,Date,Status,Amount,Balance,Currency\n";
        let err = snapshot_from_bytes("Transactions_699112233.csv", data.as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::EmptyFile(_)));
    }

    #[test]
    fn missing_balance_column_is_rejected() {
        let data = "Id,Date,Status,Amount\n1,2026-01-01,Successful,100\n";
        let err = snapshot_from_bytes("Transactions_699112233.csv", data.as_bytes()).unwrap_err();
        match err {
            IngestError::MissingColumn { column, found, .. } => {
                assert_eq!(column, "Balance");
                assert!(found.contains(&"Amount".to_string()));
            }
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn blank_balance_reads_as_zero() {
        let data = "Date,Balance\n2026-01-01,\n";
        let snap = snapshot_from_bytes("Transactions_699000001.csv", data.as_bytes()).unwrap();
        assert_eq!(snap.balance, 0.0);
    }

    #[test]
    fn garbage_balance_is_an_error() {
        let data = "Date,Balance\n2026-01-01,n/a\n";
        let err = snapshot_from_bytes("Transactions_699000001.csv", data.as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::InvalidBalance { .. }));
    }

    #[test]
    fn latin1_export_decodes() {
        // "Opéré" in Latin-1: 0xE9 is not valid UTF-8 on its own.
        let mut data = b"Date,Balance,Agent\n2026-01-01,1500,Op".to_vec();
        data.push(0xE9);
        data.extend_from_slice(b"r");
        data.push(0xE9);
        data.extend_from_slice(b"\n");
        let snap = snapshot_from_bytes("Transactions_699000002.csv", &data).unwrap();
        assert!((snap.balance - 1500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_export_filename_is_rejected() {
        let err = snapshot_from_bytes("OOS1.csv", EXPORT.as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::NotATransactionFile(_)));
    }
}
