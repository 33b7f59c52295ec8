//! Ordered block execution against the DEX predeploy.

use crate::dex::DexHandler;
use crate::primitives::{ExecutionInfo, Receipt, Transaction};
use alloy_primitives::B256;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A block of executed transactions.
#[derive(Debug)]
pub struct SealedBlock {
    pub number: u64,
    /// Timestamp of the last transaction in the block.
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub receipts: Vec<Receipt>,
    /// DEX state root after the block.
    pub state_root: B256,
}

impl SealedBlock {
    pub fn failed(&self) -> usize {
        self.receipts.iter().filter(|r| !r.success).count()
    }
}

/// Executes transactions in the order given, grouped into blocks.
///
/// A transaction whose timestamp is earlier than the previous one is rejected
/// with a failed receipt; the DEX never sees time go backwards.
#[derive(Debug)]
pub struct Sequencer {
    dex_handler: Arc<DexHandler>,
    block_size: usize,
    next_block: u64,
    last_timestamp: u64,
}

impl Sequencer {
    pub fn new(dex_handler: Arc<DexHandler>, block_size: usize) -> Self {
        Self {
            dex_handler,
            block_size: block_size.max(1),
            next_block: 1,
            last_timestamp: 0,
        }
    }

    pub fn dex_handler(&self) -> &Arc<DexHandler> {
        &self.dex_handler
    }

    /// Execute all transactions, sealing a block every `block_size` of them.
    pub fn execute_all(&mut self, transactions: Vec<Transaction>) -> Vec<SealedBlock> {
        let mut blocks = Vec::with_capacity(transactions.len().div_ceil(self.block_size));
        let mut pending = transactions.into_iter().peekable();
        while pending.peek().is_some() {
            let batch: Vec<_> = pending.by_ref().take(self.block_size).collect();
            blocks.push(self.execute_block(batch));
        }
        blocks
    }

    /// Execute one block of transactions.
    pub fn execute_block(&mut self, transactions: Vec<Transaction>) -> SealedBlock {
        let number = self.next_block;
        let mut info = ExecutionInfo::with_capacity(transactions.len());

        for tx in transactions {
            if tx.timestamp < self.last_timestamp {
                warn!(
                    block = number,
                    timestamp = tx.timestamp,
                    last = self.last_timestamp,
                    "Rejecting DEX transaction with stale timestamp"
                );
                let error = format!(
                    "timestamp {} is before previous transaction at {}",
                    tx.timestamp, self.last_timestamp
                );
                info.record_failure(tx, error);
                continue;
            }
            self.last_timestamp = tx.timestamp;

            match self
                .dex_handler
                .handle_transaction(tx.caller, tx.timestamp, &tx.input)
            {
                Ok(result) => {
                    let logs = self.dex_handler.create_logs(&result);
                    debug!(
                        block = number,
                        function = result.function,
                        logs = logs.len(),
                        "DEX transaction executed"
                    );
                    info.record_success(tx, result.return_data, logs);
                }
                Err(err) => {
                    warn!(block = number, caller = %tx.caller, %err, "DEX transaction failed");
                    info.record_failure(tx, err.to_string());
                }
            }
        }

        self.next_block += 1;
        let state_root = self.dex_handler.state_root();
        info!(
            block = number,
            transactions = info.executed_transactions.len(),
            failed = info.failed,
            logs = info.cumulative_logs,
            %state_root,
            "Sealed block"
        );

        SealedBlock {
            number,
            timestamp: self.last_timestamp,
            transactions: info.executed_transactions,
            receipts: info.receipts,
            state_root,
        }
    }
}
