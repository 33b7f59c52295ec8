//! Transaction and receipt types for block execution.

use alloy_primitives::{keccak256, Address, Bytes, Log, B256};
use std::str::FromStr;

/// A call to the DEX predeploy, as ordered by the sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub timestamp: u64,
    pub caller: Address,
    pub input: Bytes,
}

impl Transaction {
    pub fn new(timestamp: u64, caller: Address, input: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            caller,
            input: input.into(),
        }
    }

    pub fn hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(8 + 20 + self.input.len());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(self.caller.as_slice());
        buf.extend_from_slice(&self.input);
        keccak256(buf)
    }

    /// Parse one line of a transaction log: `<timestamp> <caller> <0x-calldata>`.
    ///
    /// Blank lines and `#` comments yield `None`.
    pub fn parse_line(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            return Ok(None);
        }

        let mut fields = line.split_whitespace();
        let timestamp = fields.next().ok_or(ParseError::MissingField("timestamp"))?;
        let caller = fields.next().ok_or(ParseError::MissingField("caller"))?;
        let input = fields.next().ok_or(ParseError::MissingField("calldata"))?;
        if let Some(extra) = fields.next() {
            return Err(ParseError::Unexpected(extra.to_string()));
        }

        let timestamp = timestamp
            .parse()
            .map_err(|_| ParseError::Timestamp(timestamp.to_string()))?;
        let caller =
            Address::from_str(caller).map_err(|_| ParseError::Address(caller.to_string()))?;
        let input = hex::decode(input.trim_start_matches("0x"))
            .map_err(|e| ParseError::Calldata(e.to_string()))?;

        Ok(Some(Self::new(timestamp, caller, input)))
    }
}

/// Errors reading a transaction log line.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("unexpected field: {0}")]
    Unexpected(String),

    #[error("invalid timestamp: {0}")]
    Timestamp(String),

    #[error("invalid address: {0}")]
    Address(String),

    #[error("invalid calldata: {0}")]
    Calldata(String),
}

/// Outcome of one executed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: B256,
    pub success: bool,
    pub return_data: Bytes,
    pub logs: Vec<Log>,
    /// Rejection reason for a failed transaction.
    pub error: Option<String>,
    pub cumulative_logs: u64,
}

/// Execution information collected while building a block.
#[derive(Default, Debug)]
pub struct ExecutionInfo {
    pub executed_transactions: Vec<Transaction>,
    pub receipts: Vec<Receipt>,
    pub cumulative_logs: u64,
    pub failed: usize,
}

impl ExecutionInfo {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            executed_transactions: Vec::with_capacity(capacity),
            receipts: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    pub fn record_success(&mut self, tx: Transaction, return_data: Bytes, logs: Vec<Log>) {
        self.cumulative_logs += logs.len() as u64;
        self.receipts.push(Receipt {
            tx_hash: tx.hash(),
            success: true,
            return_data,
            logs,
            error: None,
            cumulative_logs: self.cumulative_logs,
        });
        self.executed_transactions.push(tx);
    }

    pub fn record_failure(&mut self, tx: Transaction, error: String) {
        self.failed += 1;
        self.receipts.push(Receipt {
            tx_hash: tx.hash(),
            success: false,
            return_data: Bytes::new(),
            logs: Vec::new(),
            error: Some(error),
            cumulative_logs: self.cumulative_logs,
        });
        self.executed_transactions.push(tx);
    }
}
