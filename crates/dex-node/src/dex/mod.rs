//! DEX predeploy: calldata decoding, execution and logs.

mod handler;
mod types;

pub use handler::{decode_operation, event_log, DexHandler};
pub use types::{DexResult, HandlerError};
