//! Pair registry: creates one pool per unordered token pair.

use crate::error::DexError;
use crate::pair::{PairKey, PoolId};
use crate::pool::Pool;
use crate::types::TokenId;
use std::collections::{BTreeSet, HashMap};
use tracing::info;

/// Append-only registry of pools keyed by their canonical token pair.
///
/// The registry owns the pools but never touches reserves itself; all
/// reserve changes go through [`Pool`] methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairRegistry {
    /// All pools indexed by their identity.
    pools: HashMap<PoolId, Pool>,
    /// Pool identities in creation order.
    created: Vec<PoolId>,
    /// Index of tokens to the pools they trade in, for routing.
    token_pairs: HashMap<TokenId, BTreeSet<PoolId>>,
}

impl PairRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty pool for a token pair.
    pub fn create_pair(&mut self, token_a: TokenId, token_b: TokenId) -> Result<PoolId, DexError> {
        let key = PairKey::new(token_a, token_b)?;
        let pool_id = key.id();

        if self.pools.contains_key(&pool_id) {
            return Err(DexError::PairExists(pool_id));
        }

        self.pools.insert(pool_id, Pool::new(key));
        self.created.push(pool_id);
        for token in [key.token0(), key.token1()] {
            self.token_pairs.entry(token).or_default().insert(pool_id);
        }

        info!(pool = %pool_id, token0 = %key.token0(), token1 = %key.token1(), "pair created");
        Ok(pool_id)
    }

    /// Look up the pool for a token pair without creating it.
    pub fn get_pair(&self, token_a: TokenId, token_b: TokenId) -> Option<PoolId> {
        if token_a == token_b {
            return None;
        }
        let pool_id = PoolId::from_tokens(token_a, token_b);
        self.pools.contains_key(&pool_id).then_some(pool_id)
    }

    /// Look up the pool for a token pair, failing with `PairNotFound`.
    pub fn require_pair(&self, token_a: TokenId, token_b: TokenId) -> Result<PoolId, DexError> {
        self.get_pair(token_a, token_b)
            .ok_or(DexError::PairNotFound(token_a, token_b))
    }

    /// All pool identities in creation order.
    ///
    /// Every call starts a fresh pass over the current registry.
    pub fn all_pairs(&self) -> impl Iterator<Item = PoolId> + '_ {
        self.created.iter().copied()
    }

    pub fn all_pairs_length(&self) -> usize {
        self.created.len()
    }

    pub fn pool(&self, pool_id: &PoolId) -> Option<&Pool> {
        self.pools.get(pool_id)
    }

    /// Look up a pool, failing with `PoolNotFound`.
    pub fn require_pool(&self, pool_id: &PoolId) -> Result<&Pool, DexError> {
        self.pools
            .get(pool_id)
            .ok_or(DexError::PoolNotFound(*pool_id))
    }

    pub(crate) fn require_pool_mut(&mut self, pool_id: &PoolId) -> Result<&mut Pool, DexError> {
        self.pools
            .get_mut(pool_id)
            .ok_or(DexError::PoolNotFound(*pool_id))
    }

    /// Put back a pool captured before a failed multi-step operation.
    pub(crate) fn restore(&mut self, pool: Pool) {
        self.pools.insert(pool.id(), pool);
    }

    /// Get all pools containing a specific token.
    pub fn pairs_for_token(&self, token: TokenId) -> Vec<PoolId> {
        self.token_pairs
            .get(&token)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Tokens that share a pool with `token`.
    pub fn neighbors(&self, token: TokenId) -> impl Iterator<Item = TokenId> + '_ {
        self.token_pairs
            .get(&token)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.pools.get(id)?.key().other_token(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    fn setup_tokens() -> (TokenId, TokenId, TokenId) {
        let eth = Address::ZERO;
        let usdc = Address::repeat_byte(0x01);
        let wbtc = Address::repeat_byte(0x02);
        (eth, usdc, wbtc)
    }

    #[test]
    fn test_create_pair() {
        let mut registry = PairRegistry::new();
        let (eth, usdc, _) = setup_tokens();

        let pool_id = registry.create_pair(eth, usdc).unwrap();
        assert_eq!(registry.get_pair(usdc, eth), Some(pool_id));

        let pool = registry.pool(&pool_id).unwrap();
        assert_eq!(pool.key().token0(), eth);
        assert!(pool.total_shares().is_zero());

        // Can't create duplicate, in either order
        assert_eq!(
            registry.create_pair(usdc, eth),
            Err(DexError::PairExists(pool_id))
        );

        // Can't create with same token
        assert_eq!(
            registry.create_pair(eth, eth),
            Err(DexError::IdenticalTokens(eth))
        );
        assert_eq!(registry.all_pairs_length(), 1);
    }

    #[test]
    fn test_get_pair_does_not_create() {
        let registry = PairRegistry::new();
        let (eth, usdc, _) = setup_tokens();

        assert_eq!(registry.get_pair(eth, usdc), None);
        assert_eq!(registry.get_pair(eth, eth), None);
        assert_eq!(
            registry.require_pair(eth, usdc),
            Err(DexError::PairNotFound(eth, usdc))
        );
        assert_eq!(registry.all_pairs_length(), 0);
    }

    #[test]
    fn test_all_pairs_in_creation_order() {
        let mut registry = PairRegistry::new();
        let (eth, usdc, wbtc) = setup_tokens();

        let first = registry.create_pair(wbtc, usdc).unwrap();
        let second = registry.create_pair(eth, usdc).unwrap();

        let mut pass = registry.all_pairs();
        assert_eq!(pass.next(), Some(first));

        // a new pass starts over
        let all: Vec<_> = registry.all_pairs().collect();
        assert_eq!(all, vec![first, second]);
        assert_eq!(pass.next(), Some(second));
        assert_eq!(pass.next(), None);
    }

    #[test]
    fn test_token_index() {
        let mut registry = PairRegistry::new();
        let (eth, usdc, wbtc) = setup_tokens();

        registry.create_pair(eth, usdc).unwrap();
        registry.create_pair(usdc, wbtc).unwrap();

        assert_eq!(registry.pairs_for_token(usdc).len(), 2);
        assert_eq!(registry.pairs_for_token(eth).len(), 1);

        let mut neighbors: Vec<_> = registry.neighbors(usdc).collect();
        neighbors.sort();
        assert_eq!(neighbors, vec![eth, wbtc]);
        assert_eq!(registry.neighbors(Address::repeat_byte(0x09)).count(), 0);
    }
}
