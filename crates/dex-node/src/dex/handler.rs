//! DEX transaction handler.

use super::types::{DexResult, HandlerError};
use crate::selectors::{selectors, IDex};
use crate::DEX_PREDEPLOY_ADDRESS;
use alloy_primitives::{Bytes, Log, B256, U256};
use alloy_sol_types::{SolCall, SolEvent, SolValue};
use dex::{
    Address, DexEvent, Operation, Outcome, PoolId, PoolManager, ProposalAction, Timestamp,
};
use parking_lot::RwLock;
use tracing::{debug, info};

/// Handler for DEX predeploy calls.
///
/// Calls are applied one at a time under the write lock, so each call sees
/// every earlier call's committed state and nothing of a failed one.
#[derive(Debug)]
pub struct DexHandler {
    pool_manager: RwLock<PoolManager>,
}

impl DexHandler {
    /// Create a handler around an initialized pool manager.
    ///
    /// Events raised while setting up the manager (the token genesis) are not
    /// attributed to any transaction and are dropped here.
    pub fn new(mut pool_manager: PoolManager) -> Self {
        let setup_events = pool_manager.take_events();
        debug!(count = setup_events.len(), "dropped setup events");
        Self {
            pool_manager: RwLock::new(pool_manager),
        }
    }

    /// Hash of the current DEX state.
    pub fn state_root(&self) -> B256 {
        self.pool_manager.read().state_root()
    }

    /// Run `f` with read access to the pool manager.
    pub fn read<R>(&self, f: impl FnOnce(&PoolManager) -> R) -> R {
        f(&self.pool_manager.read())
    }

    /// Handle a call to the DEX predeploy.
    ///
    /// # Arguments
    /// * `caller` - The address calling the DEX
    /// * `now` - Timestamp assigned by the sequencer
    /// * `calldata` - The transaction calldata
    pub fn handle_transaction(
        &self,
        caller: Address,
        now: Timestamp,
        calldata: &[u8],
    ) -> Result<DexResult, HandlerError> {
        if calldata.len() < 4 {
            return Err(HandlerError::InvalidCalldata(
                "calldata too short for function selector".to_string(),
            ));
        }

        let (selector, data) = calldata.split_at(4);
        match selector {
            s if s == selectors::GET_PAIR.as_slice() => self.handle_get_pair(data),
            s if s == selectors::GET_AMOUNTS_OUT.as_slice() => self.handle_get_amounts_out(data),
            s if s == selectors::GET_AMOUNTS_IN.as_slice() => self.handle_get_amounts_in(data),
            _ => {
                let operation = decode_operation(selector, data)?;
                self.execute(caller, now, operation)
            }
        }
    }

    fn execute(
        &self,
        caller: Address,
        now: Timestamp,
        operation: Operation,
    ) -> Result<DexResult, HandlerError> {
        let function = operation.name();
        debug!(function, %caller, now, "DEX call");

        let (outcome, events) = {
            let mut pm = self.pool_manager.write();
            let outcome = pm.apply(caller, now, operation)?;
            (outcome, pm.take_events())
        };

        info!(function, %caller, events = events.len(), "DEX call executed");
        Ok(DexResult {
            function,
            return_data: encode_outcome(&outcome),
            events,
        })
    }

    /// Handle getPair(address,address)
    fn handle_get_pair(&self, data: &[u8]) -> Result<DexResult, HandlerError> {
        let call: IDex::getPairCall = decode(data)?;
        let pool = self
            .pool_manager
            .read()
            .get_pair(call.tokenA, call.tokenB)
            .map(|id| id.as_b256())
            .unwrap_or(B256::ZERO);
        Ok(view("getPair", pool.abi_encode()))
    }

    /// Handle getAmountsOut(uint256,address[])
    fn handle_get_amounts_out(&self, data: &[u8]) -> Result<DexResult, HandlerError> {
        let call: IDex::getAmountsOutCall = decode(data)?;
        let amounts = self
            .pool_manager
            .read()
            .get_amounts_out(call.amountIn, &call.path)?;
        Ok(view("getAmountsOut", amounts.abi_encode()))
    }

    /// Handle getAmountsIn(uint256,address[])
    fn handle_get_amounts_in(&self, data: &[u8]) -> Result<DexResult, HandlerError> {
        let call: IDex::getAmountsInCall = decode(data)?;
        let amounts = self
            .pool_manager
            .read()
            .get_amounts_in(call.amountOut, &call.path)?;
        Ok(view("getAmountsIn", amounts.abi_encode()))
    }

    /// Create logs for a DEX call result.
    pub fn create_logs(&self, result: &DexResult) -> Vec<Log> {
        result.events.iter().map(event_log).collect()
    }
}

impl Default for DexHandler {
    fn default() -> Self {
        Self::new(PoolManager::new())
    }
}

fn view(function: &'static str, return_data: Vec<u8>) -> DexResult {
    DexResult {
        function,
        return_data: return_data.into(),
        events: Vec::new(),
    }
}

fn decode<C: SolCall>(data: &[u8]) -> Result<C, HandlerError> {
    C::abi_decode_raw(data).map_err(|e| {
        HandlerError::InvalidCalldata(format!("failed to decode {}: {}", C::SIGNATURE, e))
    })
}

fn proposal_id(id: U256) -> Result<u64, HandlerError> {
    id.try_into()
        .map_err(|_| HandlerError::InvalidCalldata(format!("proposal id out of range: {id}")))
}

/// Decode the arguments of a state-changing call into an [`Operation`].
pub fn decode_operation(selector: &[u8], data: &[u8]) -> Result<Operation, HandlerError> {
    let operation = match selector {
        s if s == selectors::CREATE_PAIR.as_slice() => {
            let call: IDex::createPairCall = decode(data)?;
            Operation::CreatePair {
                token_a: call.tokenA,
                token_b: call.tokenB,
            }
        }
        s if s == selectors::ADD_LIQUIDITY.as_slice() => {
            let call: IDex::addLiquidityCall = decode(data)?;
            Operation::AddLiquidity {
                pool: PoolId::from(call.pool),
                amount0: call.amount0,
                amount1: call.amount1,
            }
        }
        s if s == selectors::REMOVE_LIQUIDITY.as_slice() => {
            let call: IDex::removeLiquidityCall = decode(data)?;
            Operation::RemoveLiquidity {
                pool: PoolId::from(call.pool),
                shares: call.shares,
            }
        }
        s if s == selectors::SWAP.as_slice() => {
            let call: IDex::swapCall = decode(data)?;
            Operation::Swap {
                pool: PoolId::from(call.pool),
                amount_in: call.amountIn,
                token_in_is_first: call.tokenInIsFirst,
                min_amount_out: call.minAmountOut,
            }
        }
        s if s == selectors::SWAP_EXACT_TOKENS_FOR_TOKENS.as_slice() => {
            let call: IDex::swapExactTokensForTokensCall = decode(data)?;
            Operation::SwapExactTokensForTokens {
                amount_in: call.amountIn,
                amount_out_min: call.amountOutMin,
                path: call.path,
                deadline: call.deadline,
            }
        }
        s if s == selectors::SWAP_TOKENS_FOR_EXACT_TOKENS.as_slice() => {
            let call: IDex::swapTokensForExactTokensCall = decode(data)?;
            Operation::SwapTokensForExactTokens {
                amount_out: call.amountOut,
                amount_in_max: call.amountInMax,
                path: call.path,
                deadline: call.deadline,
            }
        }
        s if s == selectors::PROPOSE.as_slice() => {
            let call: IDex::proposeCall = decode(data)?;
            Operation::Propose {
                description: call.description,
                action: ProposalAction::from_parts(call.actionKind, call.actionValue)?,
            }
        }
        s if s == selectors::VOTE.as_slice() => {
            let call: IDex::voteCall = decode(data)?;
            Operation::Vote {
                proposal_id: proposal_id(call.id)?,
                support: call.support,
                weight: (!call.weight.is_zero()).then_some(call.weight),
            }
        }
        s if s == selectors::EXECUTE.as_slice() => {
            let call: IDex::executeCall = decode(data)?;
            Operation::Execute {
                proposal_id: proposal_id(call.id)?,
            }
        }
        s if s == selectors::TRANSFER.as_slice() => {
            let call: IDex::transferCall = decode(data)?;
            Operation::Transfer {
                to: call.to,
                amount: call.amount,
            }
        }
        _ => return Err(HandlerError::UnknownSelector(hex::encode(selector))),
    };
    Ok(operation)
}

fn encode_outcome(outcome: &Outcome) -> Bytes {
    let encoded = match outcome {
        Outcome::PairCreated(pool) => pool.as_b256().abi_encode(),
        Outcome::LiquidityAdded(added) => added.shares.abi_encode(),
        Outcome::LiquidityRemoved(removed) => (removed.amount0, removed.amount1).abi_encode(),
        Outcome::Swapped(amount_out) => amount_out.abi_encode(),
        Outcome::Routed(route) => {
            let amounts: Vec<U256> = std::iter::once(route.amount_in())
                .chain(route.hops.iter().map(|hop| hop.amount_out))
                .collect();
            amounts.abi_encode()
        }
        Outcome::Proposed(id) => U256::from(*id).abi_encode(),
        Outcome::Voted(_) | Outcome::Executed(_) => Vec::new(),
        Outcome::Transferred => true.abi_encode(),
    };
    encoded.into()
}

/// The EVM log for a DEX event, emitted from the predeploy address.
pub fn event_log(event: &DexEvent) -> Log {
    let data = match event {
        DexEvent::PairCreated {
            pool,
            token0,
            token1,
            pair_count,
        } => IDex::PairCreated {
            token0: *token0,
            token1: *token1,
            pool: pool.as_b256(),
            pairCount: U256::from(*pair_count),
        }
        .encode_log_data(),
        DexEvent::Mint {
            pool,
            provider,
            amount0,
            amount1,
            shares,
        } => IDex::Mint {
            pool: pool.as_b256(),
            provider: *provider,
            amount0: *amount0,
            amount1: *amount1,
            shares: *shares,
        }
        .encode_log_data(),
        DexEvent::Burn {
            pool,
            provider,
            amount0,
            amount1,
            shares,
        } => IDex::Burn {
            pool: pool.as_b256(),
            provider: *provider,
            amount0: *amount0,
            amount1: *amount1,
            shares: *shares,
        }
        .encode_log_data(),
        DexEvent::Swap {
            pool,
            sender,
            token_in,
            token_out,
            amount_in,
            amount_out,
        } => IDex::Swap {
            pool: pool.as_b256(),
            sender: *sender,
            tokenIn: *token_in,
            tokenOut: *token_out,
            amountIn: *amount_in,
            amountOut: *amount_out,
        }
        .encode_log_data(),
        DexEvent::ProposalCreated {
            id,
            proposer,
            action,
            deadline,
            description,
        } => IDex::ProposalCreated {
            id: U256::from(*id),
            proposer: *proposer,
            actionKind: action.kind(),
            actionValue: action.value(),
            deadline: *deadline,
            description: description.clone(),
        }
        .encode_log_data(),
        DexEvent::VoteCast {
            id,
            voter,
            support,
            weight,
        } => IDex::VoteCast {
            id: U256::from(*id),
            voter: *voter,
            support: *support,
            weight: *weight,
        }
        .encode_log_data(),
        DexEvent::ProposalExecuted { id } => IDex::ProposalExecuted {
            id: U256::from(*id),
        }
        .encode_log_data(),
        DexEvent::ConfigUpdated { action } => IDex::ConfigUpdated {
            actionKind: action.kind(),
            actionValue: action.value(),
        }
        .encode_log_data(),
        DexEvent::Transfer { from, to, amount } => IDex::Transfer {
            from: *from,
            to: *to,
            amount: *amount,
        }
        .encode_log_data(),
    };

    Log {
        address: DEX_PREDEPLOY_ADDRESS,
        data,
    }
}
