//! Type definitions for DEX operations.

use alloy_primitives::Bytes;
use dex::DexEvent;

/// Result of a DEX call.
#[derive(Debug, Clone)]
pub struct DexResult {
    /// Name of the called function.
    pub function: &'static str,
    /// ABI-encoded return values.
    pub return_data: Bytes,
    /// Events committed by the call. Empty for views.
    pub events: Vec<DexEvent>,
}

/// Errors that can occur during DEX operations.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Invalid calldata: {0}")]
    InvalidCalldata(String),

    #[error("unknown function selector: 0x{0}")]
    UnknownSelector(String),

    #[error("DEX error: {0}")]
    Dex(#[from] dex::DexError),
}
