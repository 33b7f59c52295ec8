//! Multi-hop routing and execution across pools.

use crate::config::DexConfig;
use crate::error::DexError;
use crate::math::{self, Rounding, BPS};
use crate::pair::PoolId;
use crate::pool::{self, Pool};
use crate::registry::PairRegistry;
use crate::types::{Amount, Timestamp, TokenId, U256};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info};

/// A single hop in a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteHop {
    /// The pool traded against.
    pub pool: PoolId,
    /// The input token for this hop.
    pub token_in: TokenId,
    /// The output token for this hop.
    pub token_out: TokenId,
    /// Amount sent into the pool.
    pub amount_in: Amount,
    /// Amount taken out of the pool.
    pub amount_out: Amount,
}

/// A complete route from one token to another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    /// The hops in this route.
    pub hops: Vec<RouteHop>,
}

impl Route {
    /// Get the number of hops in this route.
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// Check if the route is empty.
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Get the input token.
    pub fn token_in(&self) -> Option<TokenId> {
        self.hops.first().map(|h| h.token_in)
    }

    /// Get the output token.
    pub fn token_out(&self) -> Option<TokenId> {
        self.hops.last().map(|h| h.token_out)
    }

    /// Amount entering the first hop.
    pub fn amount_in(&self) -> Amount {
        self.hops.first().map(|h| h.amount_in).unwrap_or_default()
    }

    /// Amount leaving the last hop.
    pub fn amount_out(&self) -> Amount {
        self.hops.last().map(|h| h.amount_out).unwrap_or_default()
    }

    /// The token path this route walks.
    pub fn path(&self) -> Vec<TokenId> {
        let mut path: Vec<TokenId> = self.hops.iter().map(|h| h.token_in).collect();
        path.extend(self.token_out());
        path
    }
}

/// A quote for a swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// The hops with simulated amounts.
    pub route: Route,
    /// Amounts at each hop boundary; `amounts[0]` is the input.
    pub amounts: Vec<Amount>,
    /// Fee charged on each hop, denominated in that hop's input token.
    pub fees: Vec<Amount>,
    /// Shortfall against a fee-free trade at the current spot prices, in bps.
    pub price_impact_bps: U256,
}

impl Quote {
    pub fn amount_in(&self) -> Amount {
        self.amounts.first().copied().unwrap_or_default()
    }

    pub fn amount_out(&self) -> Amount {
        self.amounts.last().copied().unwrap_or_default()
    }
}

/// Reserves seen by a simulation: the registry's pools, overridden by
/// whatever earlier hops of the same simulation did to them.
struct ReserveOverlay<'r> {
    registry: &'r PairRegistry,
    reserves: HashMap<PoolId, (Amount, Amount)>,
}

impl<'r> ReserveOverlay<'r> {
    fn new(registry: &'r PairRegistry) -> Self {
        Self {
            registry,
            reserves: HashMap::new(),
        }
    }

    fn pool(&self, token_in: TokenId, token_out: TokenId) -> Result<(&'r Pool, bool), DexError> {
        let pool_id = self.registry.require_pair(token_in, token_out)?;
        let pool = self.registry.require_pool(&pool_id)?;
        let token_in_is_first = pool.key().token0() == token_in;
        Ok((pool, token_in_is_first))
    }

    /// `(reserve_in, reserve_out)` as of the hops simulated so far.
    fn reserves_for(&self, pool: &Pool, token_in_is_first: bool) -> (Amount, Amount) {
        let (reserve0, reserve1) = self
            .reserves
            .get(&pool.id())
            .copied()
            .unwrap_or_else(|| pool.reserves());
        if token_in_is_first {
            (reserve0, reserve1)
        } else {
            (reserve1, reserve0)
        }
    }

    fn record(
        &mut self,
        pool: &Pool,
        token_in_is_first: bool,
        amount_in: Amount,
        amount_out: Amount,
    ) -> Result<(), DexError> {
        let (reserve_in, reserve_out) = self.reserves_for(pool, token_in_is_first);
        let reserve_in = math::add(reserve_in, amount_in)?;
        let reserve_out = math::sub(reserve_out, amount_out)?;
        let entry = if token_in_is_first {
            (reserve_in, reserve_out)
        } else {
            (reserve_out, reserve_in)
        };
        self.reserves.insert(pool.id(), entry);
        Ok(())
    }
}

/// Pools snapshotted before their first mutation in a multi-hop call, so
/// that a failing hop can put every touched pool back.
struct SwapContext<'r> {
    registry: &'r mut PairRegistry,
    originals: Vec<Pool>,
    touched: HashSet<PoolId>,
}

impl<'r> SwapContext<'r> {
    fn new(registry: &'r mut PairRegistry) -> Self {
        Self {
            registry,
            originals: Vec::new(),
            touched: HashSet::new(),
        }
    }

    fn pool_mut(&mut self, pool_id: PoolId) -> Result<&mut Pool, DexError> {
        if !self.touched.contains(&pool_id) {
            let original = self.registry.require_pool(&pool_id)?.clone();
            self.originals.push(original);
            self.touched.insert(pool_id);
        }
        self.registry.require_pool_mut(&pool_id)
    }

    fn rollback(self) {
        let restored = self.originals.len();
        for pool in self.originals {
            self.registry.restore(pool);
        }
        debug!(restored, "multi-hop swap rolled back");
    }
}

/// Computes paths and executes multi-hop swaps.
///
/// The router holds no state of its own: the registry is passed explicitly
/// to every call, and only [`Pool`] methods change reserves.
#[derive(Debug, Clone, Copy)]
pub struct Router<'c> {
    config: &'c DexConfig,
}

impl<'c> Router<'c> {
    /// Create a router using the given configuration.
    pub fn new(config: &'c DexConfig) -> Self {
        Self { config }
    }

    fn validate_path(&self, path: &[TokenId]) -> Result<(), DexError> {
        if path.len() < 2 {
            return Err(DexError::InvalidPath("path needs at least two tokens"));
        }
        let hops = path.len() - 1;
        if hops > self.config.max_routing_hops {
            return Err(DexError::TooManyHops {
                hops,
                max: self.config.max_routing_hops,
            });
        }
        if path.windows(2).any(|w| w[0] == w[1]) {
            return Err(DexError::InvalidPath("consecutive tokens must differ"));
        }
        Ok(())
    }

    /// Simulate swapping `amount_in` along `path` without changing state.
    ///
    /// Returns the amount at each hop boundary (same length as `path`).
    pub fn get_amounts_out(
        &self,
        registry: &PairRegistry,
        amount_in: Amount,
        path: &[TokenId],
    ) -> Result<Vec<Amount>, DexError> {
        Ok(self.simulate_forward(registry, amount_in, path)?.amounts)
    }

    /// Solve backward from the last hop for the input that yields exactly
    /// `amount_out` at the end of `path`.
    ///
    /// Each hop is priced against the pool's current reserves, so a path that
    /// trades through the same pool twice is rejected.
    pub fn get_amounts_in(
        &self,
        registry: &PairRegistry,
        amount_out: Amount,
        path: &[TokenId],
    ) -> Result<Vec<Amount>, DexError> {
        self.validate_path(path)?;
        let overlay = ReserveOverlay::new(registry);

        let mut seen = HashSet::with_capacity(path.len() - 1);
        let mut amounts = vec![U256::ZERO; path.len()];
        amounts[path.len() - 1] = amount_out;
        for i in (1..path.len()).rev() {
            let (pool, token_in_is_first) = overlay.pool(path[i - 1], path[i])?;
            if !seen.insert(pool.id()) {
                return Err(DexError::InvalidPath("exact-output path revisits a pool"));
            }
            let (reserve_in, reserve_out) = overlay.reserves_for(pool, token_in_is_first);
            amounts[i - 1] =
                math::get_amount_in(amounts[i], reserve_in, reserve_out, self.config.fee_bps)?;
        }
        Ok(amounts)
    }

    /// Full quote for swapping `amount_in` along `path`.
    pub fn quote(
        &self,
        registry: &PairRegistry,
        amount_in: Amount,
        path: &[TokenId],
    ) -> Result<Quote, DexError> {
        self.simulate_forward(registry, amount_in, path)
    }

    fn simulate_forward(
        &self,
        registry: &PairRegistry,
        amount_in: Amount,
        path: &[TokenId],
    ) -> Result<Quote, DexError> {
        self.validate_path(path)?;
        let mut overlay = ReserveOverlay::new(registry);

        let mut amounts = Vec::with_capacity(path.len());
        let mut fees = Vec::with_capacity(path.len() - 1);
        let mut hops = Vec::with_capacity(path.len() - 1);
        let mut ideal = amount_in;
        let mut current = amount_in;
        amounts.push(amount_in);

        for window in path.windows(2) {
            let (token_in, token_out) = (window[0], window[1]);
            let (pool, token_in_is_first) = overlay.pool(token_in, token_out)?;
            let (reserve_in, reserve_out) = overlay.reserves_for(pool, token_in_is_first);

            let amount_out =
                pool::swap_output(current, reserve_in, reserve_out, self.config.fee_bps)?;
            ideal = math::mul_div(ideal, reserve_out, reserve_in, Rounding::Down)?;
            overlay.record(pool, token_in_is_first, current, amount_out)?;

            fees.push(self.config.calculate_fee(current)?);
            hops.push(RouteHop {
                pool: pool.id(),
                token_in,
                token_out,
                amount_in: current,
                amount_out,
            });
            amounts.push(amount_out);
            current = amount_out;
        }

        let price_impact_bps = if ideal.is_zero() || current >= ideal {
            U256::ZERO
        } else {
            math::mul_div(ideal - current, U256::from(BPS), ideal, Rounding::Up)?
        };

        Ok(Quote {
            route: Route { hops },
            amounts,
            fees,
            price_impact_bps,
        })
    }

    /// Swap an exact input along `path`, requiring at least `amount_out_min`
    /// at the end.
    ///
    /// Each hop is executed with its simulated output as the pool-level
    /// minimum, in path order, so a pool visited twice sees the first visit's
    /// effect. If any hop fails, every pool touched is restored and the error
    /// is returned.
    pub fn swap_exact_tokens_for_tokens(
        &self,
        registry: &mut PairRegistry,
        amount_in: Amount,
        amount_out_min: Amount,
        path: &[TokenId],
        deadline: Timestamp,
        now: Timestamp,
    ) -> Result<Route, DexError> {
        if now > deadline {
            return Err(DexError::Expired { deadline, now });
        }
        let quote = self.simulate_forward(registry, amount_in, path)?;
        let amount_out = quote.amount_out();
        if amount_out < amount_out_min {
            return Err(DexError::SlippageExceeded {
                actual: amount_out,
                minimum: amount_out_min,
            });
        }

        let mut ctx = SwapContext::new(registry);
        match self.execute_exact_in(&mut ctx, &quote.route) {
            Ok(()) => {
                info!(
                    hops = quote.route.len(),
                    %amount_in,
                    %amount_out,
                    "exact-input swap executed"
                );
                Ok(quote.route)
            }
            Err(err) => {
                ctx.rollback();
                Err(err)
            }
        }
    }

    fn execute_exact_in(&self, ctx: &mut SwapContext<'_>, route: &Route) -> Result<(), DexError> {
        for hop in &route.hops {
            let pool = ctx.pool_mut(hop.pool)?;
            let token_in_is_first = pool.key().token0() == hop.token_in;
            pool.swap(hop.amount_in, token_in_is_first, hop.amount_out, self.config)?;
        }
        Ok(())
    }

    /// Swap as little input as needed along `path` to receive exactly
    /// `amount_out`, failing with `ExcessiveInputAmount` if that is more than
    /// `amount_in_max`.
    pub fn swap_tokens_for_exact_tokens(
        &self,
        registry: &mut PairRegistry,
        amount_out: Amount,
        amount_in_max: Amount,
        path: &[TokenId],
        deadline: Timestamp,
        now: Timestamp,
    ) -> Result<Route, DexError> {
        if now > deadline {
            return Err(DexError::Expired { deadline, now });
        }
        let amounts = self.get_amounts_in(registry, amount_out, path)?;
        let required = amounts[0];
        if required > amount_in_max {
            return Err(DexError::ExcessiveInputAmount {
                required,
                maximum: amount_in_max,
            });
        }

        let mut ctx = SwapContext::new(registry);
        match self.execute_exact_out(&mut ctx, &amounts, path) {
            Ok(route) => {
                info!(
                    hops = route.len(),
                    amount_in = %route.amount_in(),
                    %amount_out,
                    "exact-output swap executed"
                );
                Ok(route)
            }
            Err(err) => {
                ctx.rollback();
                Err(err)
            }
        }
    }

    fn execute_exact_out(
        &self,
        ctx: &mut SwapContext<'_>,
        amounts: &[Amount],
        path: &[TokenId],
    ) -> Result<Route, DexError> {
        let mut hops = Vec::with_capacity(path.len() - 1);
        for (i, window) in path.windows(2).enumerate() {
            let (token_in, token_out) = (window[0], window[1]);
            let pool_id = ctx.registry.require_pair(token_in, token_out)?;
            let pool = ctx.pool_mut(pool_id)?;
            let token_in_is_first = pool.key().token0() == token_in;
            let spent =
                pool.swap_exact_out(amounts[i + 1], token_in_is_first, amounts[i], self.config)?;
            if spent != amounts[i] {
                return Err(DexError::HopAmountMismatch {
                    hop: i,
                    expected: amounts[i],
                    actual: spent,
                });
            }
            hops.push(RouteHop {
                pool: pool_id,
                token_in,
                token_out,
                amount_in: spent,
                amount_out: amounts[i + 1],
            });
        }
        Ok(Route { hops })
    }

    /// Search the registry for the path from `token_in` to `token_out` with
    /// the highest output, using at most `max_routing_hops` hops.
    ///
    /// Shorter paths win ties.
    pub fn find_best_path(
        &self,
        registry: &PairRegistry,
        token_in: TokenId,
        token_out: TokenId,
        amount_in: Amount,
    ) -> Result<Quote, DexError> {
        if token_in == token_out {
            return Err(DexError::IdenticalTokens(token_in));
        }
        if amount_in.is_zero() {
            return Err(DexError::InsufficientInputAmount);
        }

        let mut best: Option<Quote> = None;
        for path in self.find_paths(registry, token_in, token_out) {
            let Ok(quote) = self.simulate_forward(registry, amount_in, &path) else {
                continue;
            };
            match &best {
                Some(current) if quote.amount_out() <= current.amount_out() => {}
                _ => best = Some(quote),
            }
        }

        best.ok_or(DexError::NoRouteFound)
    }

    /// All cycle-free token paths between two tokens, shortest first.
    pub fn find_paths(
        &self,
        registry: &PairRegistry,
        token_in: TokenId,
        token_out: TokenId,
    ) -> Vec<Vec<TokenId>> {
        let mut paths = Vec::new();
        let max_len = self.config.max_routing_hops + 1;

        // BFS yields paths in non-decreasing length
        let mut queue: VecDeque<Vec<TokenId>> = VecDeque::new();
        queue.push_back(vec![token_in]);

        while let Some(path) = queue.pop_front() {
            let Some(&current) = path.last() else {
                continue;
            };
            if current == token_out && path.len() > 1 {
                paths.push(path);
                continue;
            }
            if path.len() >= max_len {
                continue;
            }
            for neighbor in registry.neighbors(current) {
                // Avoid cycles
                if path.contains(&neighbor) {
                    continue;
                }
                let mut next = path.clone();
                next.push(neighbor);
                queue.push_back(next);
            }
        }

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    fn setup_tokens() -> (TokenId, TokenId, TokenId, TokenId) {
        let eth = Address::ZERO;
        let usdc = Address::repeat_byte(0x01);
        let wbtc = Address::repeat_byte(0x02);
        let dai = Address::repeat_byte(0x03);
        (eth, usdc, wbtc, dai)
    }

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    fn lp() -> Address {
        Address::repeat_byte(0xAA)
    }

    fn seed(
        registry: &mut PairRegistry,
        config: &DexConfig,
        a: TokenId,
        b: TokenId,
        amount_a: u64,
        amount_b: u64,
    ) -> PoolId {
        let pool_id = registry.create_pair(a, b).unwrap();
        let pool = registry.require_pool_mut(&pool_id).unwrap();
        let (amount0, amount1) = if pool.key().token0() == a {
            (amount_a, amount_b)
        } else {
            (amount_b, amount_a)
        };
        pool.add_liquidity(lp(), u(amount0), u(amount1), config)
            .unwrap();
        pool_id
    }

    /// ETH <-> USDC <-> WBTC, plus a direct ETH <-> WBTC pool.
    fn triangle(config: &DexConfig) -> PairRegistry {
        let (eth, usdc, wbtc, _) = setup_tokens();
        let mut registry = PairRegistry::new();
        seed(&mut registry, config, eth, usdc, 1_000_000, 2_000_000_000);
        seed(&mut registry, config, usdc, wbtc, 4_000_000_000, 100_000);
        seed(&mut registry, config, eth, wbtc, 10_000, 500);
        registry
    }

    #[test]
    fn test_invalid_paths() {
        let config = DexConfig::default();
        let router = Router::new(&config);
        let registry = triangle(&config);
        let (eth, usdc, wbtc, dai) = setup_tokens();

        assert!(matches!(
            router.get_amounts_out(&registry, u(100), &[]),
            Err(DexError::InvalidPath(_))
        ));
        assert!(matches!(
            router.get_amounts_out(&registry, u(100), &[eth]),
            Err(DexError::InvalidPath(_))
        ));
        assert!(matches!(
            router.get_amounts_out(&registry, u(100), &[eth, eth]),
            Err(DexError::InvalidPath(_))
        ));
        assert_eq!(
            router.get_amounts_out(&registry, u(100), &[eth, dai]),
            Err(DexError::PairNotFound(eth, dai))
        );
        assert_eq!(
            router.get_amounts_out(&registry, u(100), &[eth, usdc, wbtc, eth, usdc]),
            Err(DexError::TooManyHops { hops: 4, max: 3 })
        );
    }

    #[test]
    fn test_single_hop_matches_pool_quote() {
        let config = DexConfig::default();
        let router = Router::new(&config);
        let registry = triangle(&config);
        let (eth, usdc, _, _) = setup_tokens();

        let amounts = router.get_amounts_out(&registry, u(1000), &[eth, usdc]).unwrap();
        let pool = registry.pool(&registry.get_pair(eth, usdc).unwrap()).unwrap();
        assert_eq!(amounts.len(), 2);
        assert_eq!(amounts[1], pool.quote_out(u(1000), true, &config).unwrap());
    }

    #[test]
    fn test_multi_hop_composes_single_hops() {
        let config = DexConfig::default();
        let router = Router::new(&config);
        let registry = triangle(&config);
        let (eth, usdc, wbtc, _) = setup_tokens();

        let amounts = router
            .get_amounts_out(&registry, u(5000), &[eth, usdc, wbtc])
            .unwrap();
        let first = router.get_amounts_out(&registry, u(5000), &[eth, usdc]).unwrap();
        let second = router
            .get_amounts_out(&registry, first[1], &[usdc, wbtc])
            .unwrap();
        assert_eq!(amounts, vec![u(5000), first[1], second[1]]);
    }

    #[test]
    fn test_revisited_pool_sees_prior_hop() {
        let config = DexConfig::default();
        let router = Router::new(&config);
        let mut registry = triangle(&config);
        let (eth, usdc, wbtc, _) = setup_tokens();

        // ETH -> USDC -> WBTC -> ETH -> USDC visits ETH/USDC twice in the same direction
        let config_long = DexConfig::default().with_max_routing_hops(4);
        let long_router = Router::new(&config_long);
        let path = [eth, usdc, wbtc, eth, usdc];
        let amounts = long_router.get_amounts_out(&registry, u(1000), &path).unwrap();

        let stale = router
            .get_amounts_out(&registry, amounts[3], &[eth, usdc])
            .unwrap();
        assert!(amounts[4] < stale[1]);

        let route = long_router
            .swap_exact_tokens_for_tokens(&mut registry, u(1000), U256::ZERO, &path, 10, 1)
            .unwrap();
        assert_eq!(route.amount_out(), amounts[4]);
    }

    #[test]
    fn test_get_amounts_in_inverts_out() {
        let config = DexConfig::default();
        let router = Router::new(&config);
        let registry = triangle(&config);
        let (eth, usdc, wbtc, _) = setup_tokens();

        let path = [eth, usdc, wbtc];
        let amounts_in = router.get_amounts_in(&registry, u(50), &path).unwrap();
        assert_eq!(amounts_in[2], u(50));
        let amounts_out = router
            .get_amounts_out(&registry, amounts_in[0], &path)
            .unwrap();
        assert!(amounts_out[2] >= u(50));
    }

    #[test]
    fn test_expired_swap_leaves_pools_untouched() {
        let config = DexConfig::default();
        let router = Router::new(&config);
        let mut registry = triangle(&config);
        let before = registry.clone();
        let (eth, usdc, wbtc, _) = setup_tokens();

        let result = router.swap_exact_tokens_for_tokens(
            &mut registry,
            u(1000),
            U256::ZERO,
            &[eth, usdc, wbtc],
            99,
            100,
        );
        assert_eq!(result, Err(DexError::Expired { deadline: 99, now: 100 }));
        assert_eq!(registry, before);
    }

    #[test]
    fn test_slippage_checked_against_final_amount() {
        let config = DexConfig::default();
        let router = Router::new(&config);
        let mut registry = triangle(&config);
        let before = registry.clone();
        let (eth, usdc, wbtc, _) = setup_tokens();
        let path = [eth, usdc, wbtc];

        let expected = router.get_amounts_out(&registry, u(1000), &path).unwrap()[2];
        let result = router.swap_exact_tokens_for_tokens(
            &mut registry,
            u(1000),
            expected + u(1),
            &path,
            10,
            10,
        );
        assert_eq!(
            result,
            Err(DexError::SlippageExceeded {
                actual: expected,
                minimum: expected + u(1)
            })
        );
        assert_eq!(registry, before);

        let route = router
            .swap_exact_tokens_for_tokens(&mut registry, u(1000), expected, &path, 10, 10)
            .unwrap();
        assert_eq!(route.amount_out(), expected);
        assert_eq!(route.path(), path.to_vec());
    }

    #[test]
    fn test_failed_hop_rolls_back_earlier_hops() {
        let config = DexConfig::default();
        let router = Router::new(&config);
        let mut registry = triangle(&config);
        let (eth, usdc, wbtc, _) = setup_tokens();

        // The first hop succeeds, the second is too small to produce any WBTC.
        let route = Route {
            hops: vec![
                RouteHop {
                    pool: registry.get_pair(usdc, eth).unwrap(),
                    token_in: usdc,
                    token_out: eth,
                    amount_in: u(1_000_000),
                    amount_out: u(1),
                },
                RouteHop {
                    pool: registry.get_pair(eth, wbtc).unwrap(),
                    token_in: eth,
                    token_out: wbtc,
                    amount_in: u(1),
                    amount_out: u(1),
                },
            ],
        };
        let before = registry.clone();
        let mut ctx = SwapContext::new(&mut registry);
        let result = router.execute_exact_in(&mut ctx, &route);
        assert_eq!(result, Err(DexError::InsufficientOutputAmount));
        ctx.rollback();
        assert_eq!(registry, before);
    }

    #[test]
    fn test_swap_tokens_for_exact_tokens() {
        let config = DexConfig::default();
        let router = Router::new(&config);
        let mut registry = triangle(&config);
        let (eth, usdc, wbtc, _) = setup_tokens();
        let path = [eth, usdc, wbtc];

        let needed = router.get_amounts_in(&registry, u(40), &path).unwrap()[0];
        let before = registry.clone();
        assert_eq!(
            router.swap_tokens_for_exact_tokens(&mut registry, u(40), needed - u(1), &path, 5, 5),
            Err(DexError::ExcessiveInputAmount {
                required: needed,
                maximum: needed - u(1)
            })
        );
        assert_eq!(registry, before);

        let route = router
            .swap_tokens_for_exact_tokens(&mut registry, u(40), needed, &path, 5, 5)
            .unwrap();
        assert_eq!(route.amount_in(), needed);
        assert_eq!(route.amount_out(), u(40));
    }

    #[test]
    fn test_exact_output_rejects_pool_revisit() {
        let config = DexConfig::default();
        let router = Router::new(&config);
        let (eth, usdc, _, _) = setup_tokens();
        let mut registry = PairRegistry::new();
        seed(&mut registry, &config, eth, usdc, 1_000_000, 1_000_000);
        let path = [eth, usdc, eth];

        assert_eq!(
            router.get_amounts_in(&registry, u(100_000), &path),
            Err(DexError::InvalidPath("exact-output path revisits a pool"))
        );

        let before = registry.clone();
        assert_eq!(
            router.swap_tokens_for_exact_tokens(&mut registry, u(100_000), U256::MAX, &path, 5, 5),
            Err(DexError::InvalidPath("exact-output path revisits a pool"))
        );
        assert_eq!(registry, before);

        // the same round trip is still available as an exact-input swap
        let route = router
            .swap_exact_tokens_for_tokens(&mut registry, u(100_000), U256::ZERO, &path, 5, 5)
            .unwrap();
        assert_eq!(route.hops[0].amount_out, route.hops[1].amount_in);
    }

    #[test]
    fn test_exact_output_hop_must_spend_solved_input() {
        let config = DexConfig::default();
        let router = Router::new(&config);
        let (eth, usdc, _, _) = setup_tokens();
        let mut registry = PairRegistry::new();
        seed(&mut registry, &config, eth, usdc, 1_000_000, 1_000_000);
        let before = registry.clone();

        let solved = router.get_amounts_in(&registry, u(1_000), &[eth, usdc]).unwrap();
        let overstated = [solved[0] + u(5), solved[1]];

        let mut ctx = SwapContext::new(&mut registry);
        let result = router.execute_exact_out(&mut ctx, &overstated, &[eth, usdc]);
        assert_eq!(
            result,
            Err(DexError::HopAmountMismatch {
                hop: 0,
                expected: overstated[0],
                actual: solved[0],
            })
        );
        ctx.rollback();
        assert_eq!(registry, before);
    }

    #[test]
    fn test_find_paths_shortest_first() {
        let config = DexConfig::default();
        let router = Router::new(&config);
        let registry = triangle(&config);
        let (eth, usdc, wbtc, dai) = setup_tokens();

        let paths = router.find_paths(&registry, eth, wbtc);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], vec![eth, wbtc]);
        assert_eq!(paths[1], vec![eth, usdc, wbtc]);

        assert!(router.find_paths(&registry, eth, dai).is_empty());
    }

    #[test]
    fn test_find_best_path_picks_deeper_liquidity() {
        let config = DexConfig::default();
        let router = Router::new(&config);
        let registry = triangle(&config);
        let (eth, usdc, wbtc, dai) = setup_tokens();

        // the direct ETH/WBTC pool is shallow, so a large trade goes via USDC
        let quote = router.find_best_path(&registry, eth, wbtc, u(5000)).unwrap();
        assert_eq!(quote.route.path(), vec![eth, usdc, wbtc]);
        assert_eq!(quote.fees.len(), 2);
        assert!(quote.price_impact_bps > U256::ZERO);

        assert_eq!(
            router.find_best_path(&registry, eth, dai, u(5000)),
            Err(DexError::NoRouteFound)
        );
        assert_eq!(
            router.find_best_path(&registry, eth, eth, u(5000)),
            Err(DexError::IdenticalTokens(eth))
        );
    }
}
