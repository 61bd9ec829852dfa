//! Ledger Entry Model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, ErrorCode};
use crate::message::subjects;

/// Largest amount representable by `NUMERIC(20,8)` is below 10^12
pub const MAX_AMOUNT_SCALE: u32 = 8;
pub const MAX_AMOUNT_INTEGER_DIGITS: u32 = 12;

/// Direction of a ledger entry, fixed by the subject it arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Credit,
    Debit,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Credit => "credit",
            EntryKind::Debit => "debit",
        }
    }

    /// Inbound subject carrying entries of this kind
    pub fn subject(&self) -> &'static str {
        match self {
            EntryKind::Credit => subjects::LEDGER_CREDIT,
            EntryKind::Debit => subjects::LEDGER_DEBIT,
        }
    }

    pub fn from_subject(subject: &str) -> Option<Self> {
        match subject {
            subjects::LEDGER_CREDIT => Some(EntryKind::Credit),
            subjects::LEDGER_DEBIT => Some(EntryKind::Debit),
            _ => None,
        }
    }

    pub fn all() -> [EntryKind; 2] {
        [EntryKind::Credit, EntryKind::Debit]
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(EntryKind::Credit),
            "debit" => Ok(EntryKind::Debit),
            other => Err(AppError::with_message(
                ErrorCode::InvalidFormat,
                format!("unknown entry kind: {other}"),
            )),
        }
    }
}

/// Persisted, immutable ledger row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Idempotency key supplied by the producer
    pub id: String,
    pub account_id: String,
    pub amount: Decimal,
    pub kind: EntryKind,
    pub created_at: DateTime<Utc>,
}

/// Validated ledger entry awaiting insertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub id: String,
    pub account_id: String,
    pub amount: Decimal,
    pub kind: EntryKind,
}

impl NewLedgerEntry {
    pub fn into_entry(self, created_at: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id: self.id,
            account_id: self.account_id,
            amount: self.amount,
            kind: self.kind,
            created_at,
        }
    }
}

/// Check an amount fits `NUMERIC(20,8)` and is not negative
pub fn validate_amount(amount: Decimal) -> Result<Decimal, AppError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AppError::with_message(
            ErrorCode::InvalidAmount,
            "amount must not be negative",
        ));
    }
    let normalized = amount.normalize();
    if normalized.scale() > MAX_AMOUNT_SCALE {
        return Err(AppError::with_message(
            ErrorCode::InvalidAmount,
            format!("amount has more than {MAX_AMOUNT_SCALE} decimal places"),
        ));
    }
    let limit = Decimal::from(10_i64.pow(MAX_AMOUNT_INTEGER_DIGITS));
    if normalized.abs() >= limit {
        return Err(AppError::with_message(
            ErrorCode::InvalidAmount,
            "amount exceeds NUMERIC(20,8)",
        ));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_subject_mapping() {
        for kind in EntryKind::all() {
            assert_eq!(EntryKind::from_subject(kind.subject()), Some(kind));
        }
        assert_eq!(EntryKind::from_subject("ledger.refund.v1"), None);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("debit".parse::<EntryKind>().unwrap(), EntryKind::Debit);
        assert!("Debit".parse::<EntryKind>().is_err());
    }

    #[test]
    fn test_validate_amount() {
        let ok = validate_amount(Decimal::from_str("10.00000000").unwrap()).unwrap();
        assert_eq!(ok, Decimal::from(10));

        assert!(validate_amount(Decimal::from_str("-0.01").unwrap()).is_err());
        assert!(validate_amount(Decimal::from_str("0.000000001").unwrap()).is_err());
        assert!(validate_amount(Decimal::from_str("1000000000000").unwrap()).is_err());
        assert!(validate_amount(Decimal::from_str("999999999999.99999999").unwrap()).is_ok());
        assert!(validate_amount(Decimal::ZERO).is_ok());
    }
}
