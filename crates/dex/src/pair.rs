//! Canonical token pairs and pool identities.

use crate::error::DexError;
use crate::types::TokenId;
use alloy::primitives::{keccak256, B256};
use std::fmt;

/// Unique identifier for a pool.
/// This is deterministically generated from the two token IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub [u8; 32]);

impl PoolId {
    /// Derive the pool identity of an unordered token pair.
    pub fn from_tokens(token_a: TokenId, token_b: TokenId) -> Self {
        let (first, second) = sort_tokens(token_a, token_b);

        let mut data = [0u8; 40];
        data[..20].copy_from_slice(first.as_slice());
        data[20..].copy_from_slice(second.as_slice());
        Self(keccak256(data).0)
    }

    /// The identity as a 32-byte word.
    pub fn as_b256(&self) -> B256 {
        B256::from(self.0)
    }
}

impl From<B256> for PoolId {
    fn from(value: B256) -> Self {
        Self(value.0)
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_b256())
    }
}

fn sort_tokens(token_a: TokenId, token_b: TokenId) -> (TokenId, TokenId) {
    if token_a <= token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    }
}

/// A canonical token pair: `token0 < token1` by address.
///
/// `(A, B)` and `(B, A)` map to the same key. The two tokens are never equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    token0: TokenId,
    token1: TokenId,
}

impl PairKey {
    /// Build the canonical key for two tokens in any order.
    pub fn new(token_a: TokenId, token_b: TokenId) -> Result<Self, DexError> {
        if token_a == token_b {
            return Err(DexError::IdenticalTokens(token_a));
        }
        let (token0, token1) = sort_tokens(token_a, token_b);
        Ok(Self { token0, token1 })
    }

    /// The lower token address.
    pub fn token0(&self) -> TokenId {
        self.token0
    }

    /// The higher token address.
    pub fn token1(&self) -> TokenId {
        self.token1
    }

    /// Get the pool identity for this key.
    pub fn id(&self) -> PoolId {
        PoolId::from_tokens(self.token0, self.token1)
    }

    /// Check if this pair contains the given token.
    pub fn contains(&self, token: TokenId) -> bool {
        self.token0 == token || self.token1 == token
    }

    /// Get the other token in the pair.
    pub fn other_token(&self, token: TokenId) -> Option<TokenId> {
        if self.token0 == token {
            Some(self.token1)
        } else if self.token1 == token {
            Some(self.token0)
        } else {
            None
        }
    }

    /// Whether `token` is `token0`, i.e. sits on the first reserve.
    /// Returns `None` if the token is not part of the pair.
    pub fn is_first(&self, token: TokenId) -> Option<bool> {
        if self.token0 == token {
            Some(true)
        } else if self.token1 == token {
            Some(false)
        } else {
            None
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.token0, self.token1)
    }
}
