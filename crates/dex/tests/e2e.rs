//! End-to-end tests for the DEX core.

use dex::{
    whole_tokens, Address, DexError, DexEvent, LoggedOperation, Operation, Outcome, PoolId,
    PoolManager, ProposalAction, ProposalStatus, TokenId, DAY, U256,
};

// Token addresses for testing
fn eth() -> Address {
    Address::ZERO
}

fn usdc() -> Address {
    Address::repeat_byte(0x01)
}

fn wbtc() -> Address {
    Address::repeat_byte(0x02)
}

fn dai() -> Address {
    Address::repeat_byte(0x03)
}

// Trader addresses
fn alice() -> Address {
    Address::repeat_byte(0xAA)
}

fn bob() -> Address {
    Address::repeat_byte(0xBB)
}

fn charlie() -> Address {
    Address::repeat_byte(0xCC)
}

fn dave() -> Address {
    Address::repeat_byte(0xDD)
}

fn amount(value: u64) -> U256 {
    U256::from(value)
}

/// Create a pair and seed it, taking amounts in the caller's token order.
fn seed(
    pm: &mut PoolManager,
    token_a: TokenId,
    token_b: TokenId,
    amount_a: u64,
    amount_b: u64,
) -> PoolId {
    let pool = pm.create_pair(token_a, token_b).unwrap();
    let (amount0, amount1) = if token_a < token_b {
        (amount_a, amount_b)
    } else {
        (amount_b, amount_a)
    };
    pm.add_liquidity(alice(), pool, amount(amount0), amount(amount1))
        .unwrap();
    pool
}

/// ETH/USDC, USDC/WBTC and ETH/WBTC pools, plus an unseeded DAI/USDC pair.
fn setup_market() -> PoolManager {
    let mut pm = PoolManager::new().with_genesis(alice(), 0).unwrap();
    seed(&mut pm, eth(), usdc(), 1_000_000, 2_000_000_000);
    seed(&mut pm, usdc(), wbtc(), 4_000_000_000, 100_000);
    seed(&mut pm, eth(), wbtc(), 10_000, 500);
    pm.create_pair(dai(), usdc()).unwrap();
    pm.take_events();
    pm
}

#[test]
fn test_reference_trade() {
    let mut pm = PoolManager::new();
    let pool = seed(&mut pm, eth(), usdc(), 1_000, 1_000);

    let out = pm
        .swap(bob(), pool, amount(100), true, U256::ZERO)
        .unwrap();
    assert_eq!(out, amount(90));

    let (reserve0, reserve1) = pm.pool(&pool).unwrap().reserves();
    assert_eq!((reserve0, reserve1), (amount(1_100), amount(910)));
    assert!(reserve0 * reserve1 >= amount(1_000_000));
}

#[test]
fn test_add_remove_round_trip() {
    let mut pm = PoolManager::new();
    let pool = seed(&mut pm, eth(), usdc(), 10_000, 40_000);

    let added = pm
        .add_liquidity(bob(), pool, amount(3_000), amount(12_000))
        .unwrap();
    assert_eq!(added.shares, amount(6_000));
    assert_eq!(
        (added.refund0, added.refund1),
        (U256::ZERO, U256::ZERO)
    );

    let removed = pm.remove_liquidity(bob(), pool, added.shares).unwrap();
    assert_eq!(removed.amount0, amount(3_000));
    assert_eq!(removed.amount1, amount(12_000));
    assert_eq!(pm.pool(&pool).unwrap().shares_of(bob()), U256::ZERO);
    assert_eq!(
        pm.pool(&pool).unwrap().reserves(),
        (amount(10_000), amount(40_000))
    );
}

#[test]
fn test_remove_more_than_held_fails() {
    let mut pm = PoolManager::new();
    let pool = seed(&mut pm, eth(), usdc(), 10_000, 10_000);

    assert_eq!(
        pm.remove_liquidity(bob(), pool, amount(1)),
        Err(DexError::InsufficientShares {
            held: U256::ZERO,
            requested: amount(1)
        })
    );
}

#[test]
fn test_product_never_decreases() {
    let mut pm = setup_market();
    let pool = pm.get_pair(eth(), usdc()).unwrap();

    let mut k = pm.pool(&pool).unwrap().k();
    for i in 1..=50u64 {
        let token_in_is_first = i % 3 != 0;
        let amount_in = if token_in_is_first { i * 1_337 } else { i * 2_674_000 };
        pm.swap(bob(), pool, amount(amount_in), token_in_is_first, U256::ZERO)
            .unwrap();

        let next = pm.pool(&pool).unwrap().k();
        assert!(next >= k, "k decreased on swap {i}");
        k = next;
    }
}

#[test]
fn test_multi_hop_matches_single_hops() {
    let pm = setup_market();
    let amount_in = amount(1_000);

    let amounts = pm.get_amounts_out(amount_in, &[eth(), usdc(), wbtc()]).unwrap();

    let first = pm.get_amounts_out(amount_in, &[eth(), usdc()]).unwrap();
    let second = pm.get_amounts_out(first[1], &[usdc(), wbtc()]).unwrap();
    assert_eq!(amounts, vec![amount_in, first[1], second[1]]);
}

#[test]
fn test_min_out_one_above_fails() {
    let mut pm = setup_market();
    let pool = pm.get_pair(eth(), usdc()).unwrap();
    let expected = pm.get_amounts_out(amount(5_000), &[eth(), usdc()]).unwrap()[1];

    assert_eq!(
        pm.swap(bob(), pool, amount(5_000), true, expected + U256::from(1)),
        Err(DexError::SlippageExceeded {
            actual: expected,
            minimum: expected + U256::from(1)
        })
    );
    assert_eq!(
        pm.swap(bob(), pool, amount(5_000), true, expected),
        Ok(expected)
    );
}

#[test]
fn test_expired_swap_leaves_pools_untouched() {
    let mut pm = setup_market();
    let root = pm.state_root();

    assert_eq!(
        pm.swap_exact_tokens_for_tokens(
            bob(),
            amount(1_000),
            U256::ZERO,
            &[eth(), usdc(), wbtc()],
            999,
            1_000
        ),
        Err(DexError::Expired {
            deadline: 999,
            now: 1_000
        })
    );
    assert_eq!(
        pm.swap_tokens_for_exact_tokens(bob(), amount(10), U256::MAX, &[eth(), wbtc()], 999, 1_000),
        Err(DexError::Expired {
            deadline: 999,
            now: 1_000
        })
    );
    assert_eq!(pm.state_root(), root);
    assert!(pm.events().is_empty());
}

#[test]
fn test_multi_hop_swap_executes_all_hops() {
    let mut pm = setup_market();
    let path = [eth(), usdc(), wbtc()];
    let expected = pm.get_amounts_out(amount(1_000), &path).unwrap();

    let route = pm
        .swap_exact_tokens_for_tokens(bob(), amount(1_000), expected[2], &path, 100, 50)
        .unwrap();
    assert_eq!(route.len(), 2);
    assert_eq!(route.amount_out(), expected[2]);

    let swaps = pm
        .take_events()
        .into_iter()
        .filter(|e| matches!(e, DexEvent::Swap { .. }))
        .count();
    assert_eq!(swaps, 2);
}

#[test]
fn test_exact_output_swap() {
    let mut pm = setup_market();
    let path = [wbtc(), usdc(), eth()];
    let needed = pm.get_amounts_in(amount(100), &path).unwrap();

    assert!(matches!(
        pm.swap_tokens_for_exact_tokens(bob(), amount(100), needed[0] - U256::from(1), &path, 10, 5),
        Err(DexError::ExcessiveInputAmount { .. })
    ));

    let route = pm
        .swap_tokens_for_exact_tokens(bob(), amount(100), needed[0], &path, 10, 5)
        .unwrap();
    assert_eq!(route.amount_out(), amount(100));
    assert!(route.amount_in() <= needed[0]);
}

#[test]
fn test_failed_route_rolls_back() {
    let mut pm = setup_market();
    let root = pm.state_root();

    // the DAI/USDC pool exists but has no liquidity
    let err = pm
        .swap_exact_tokens_for_tokens(bob(), amount(1_000), U256::ZERO, &[eth(), usdc(), dai()], 10, 5)
        .unwrap_err();
    assert_eq!(err, DexError::InsufficientLiquidity);
    assert_eq!(pm.state_root(), root);
}

#[test]
fn test_best_path_uses_deeper_route() {
    let pm = setup_market();
    let quote = pm.find_best_path(eth(), wbtc(), amount(1_000)).unwrap();
    let direct = pm.get_amounts_out(amount(1_000), &[eth(), wbtc()]).unwrap();

    assert!(quote.amount_out() >= direct[1]);
    assert_eq!(quote.route.token_in(), Some(eth()));
    assert_eq!(quote.route.token_out(), Some(wbtc()));
}

/// Alice keeps 600k DEXG; Bob and Charlie hold 300k and 100k from t=1.
fn setup_governance() -> PoolManager {
    let mut pm = PoolManager::new().with_genesis(alice(), 0).unwrap();
    pm.transfer(alice(), bob(), whole_tokens(300_000), 1).unwrap();
    pm.transfer(alice(), charlie(), whole_tokens(100_000), 1).unwrap();
    pm
}

#[test]
fn test_governance_majority_wins() {
    let mut pm = setup_governance();

    assert!(matches!(
        pm.propose(dave(), "fee".into(), ProposalAction::SetFeeBps(25), 10),
        Err(DexError::InsufficientBalance { .. })
    ));

    let id = pm
        .propose(charlie(), "fee".into(), ProposalAction::SetFeeBps(25), 10)
        .unwrap();
    pm.vote(bob(), id, true, None, 20).unwrap();
    pm.vote(charlie(), id, false, None, 30).unwrap();

    assert_eq!(
        pm.governance().status_at(id, 10 + 3 * DAY),
        Ok(ProposalStatus::Active)
    );
    let closed = 10 + 3 * DAY + 1;
    assert_eq!(
        pm.governance().status_at(id, closed),
        Ok(ProposalStatus::Succeeded)
    );

    pm.execute(id, closed).unwrap();
    assert_eq!(pm.config().fee_bps, 25);
}

#[test]
fn test_governance_tie_is_defeated() {
    let mut pm = setup_governance();
    let id = pm
        .propose(alice(), "fee".into(), ProposalAction::SetFeeBps(25), 10)
        .unwrap();
    pm.vote(bob(), id, true, Some(whole_tokens(100_000)), 20).unwrap();
    pm.vote(charlie(), id, false, None, 30).unwrap();

    let closed = 10 + 3 * DAY + 1;
    assert_eq!(
        pm.governance().status_at(id, closed),
        Ok(ProposalStatus::Defeated)
    );
    assert_eq!(pm.execute(id, closed), Err(DexError::ProposalNotSucceeded(id)));
    assert_eq!(pm.config().fee_bps, 30);
}

#[test]
fn test_double_vote_rejected() {
    let mut pm = setup_governance();
    let id = pm
        .propose(alice(), "fee".into(), ProposalAction::SetFeeBps(25), 10)
        .unwrap();
    pm.vote(bob(), id, true, Some(whole_tokens(1)), 20).unwrap();

    let root = pm.state_root();
    assert_eq!(
        pm.vote(bob(), id, false, None, 21),
        Err(DexError::AlreadyVoted(id))
    );
    assert_eq!(pm.state_root(), root);
}

#[test]
fn test_transfer_after_proposal_does_not_add_weight() {
    let mut pm = setup_governance();
    let id = pm
        .propose(alice(), "fee".into(), ProposalAction::SetFeeBps(25), 10)
        .unwrap();

    pm.transfer(alice(), dave(), whole_tokens(500_000), 11).unwrap();
    assert!(matches!(
        pm.vote(dave(), id, true, None, 12),
        Err(DexError::InsufficientBalance { .. })
    ));
}

fn market_log() -> Vec<LoggedOperation> {
    let pool = PoolId::from_tokens(eth(), usdc());
    vec![
        LoggedOperation::new(
            bob(),
            1,
            Operation::CreatePair {
                token_a: usdc(),
                token_b: eth(),
            },
        ),
        LoggedOperation::new(
            bob(),
            2,
            Operation::AddLiquidity {
                pool,
                amount0: amount(1_000_000),
                amount1: amount(3_000_000),
            },
        ),
        LoggedOperation::new(
            charlie(),
            3,
            Operation::SwapExactTokensForTokens {
                amount_in: amount(10_000),
                amount_out_min: U256::ZERO,
                path: vec![eth(), usdc()],
                deadline: 10,
            },
        ),
        // rejected: expired
        LoggedOperation::new(
            charlie(),
            11,
            Operation::SwapExactTokensForTokens {
                amount_in: amount(10_000),
                amount_out_min: U256::ZERO,
                path: vec![eth(), usdc()],
                deadline: 10,
            },
        ),
        LoggedOperation::new(
            alice(),
            12,
            Operation::Propose {
                description: "raise fee".into(),
                action: ProposalAction::SetFeeBps(50),
            },
        ),
        LoggedOperation::new(
            alice(),
            13,
            Operation::Vote {
                proposal_id: 1,
                support: true,
                weight: None,
            },
        ),
        LoggedOperation::new(alice(), 14 + 3 * DAY, Operation::Execute { proposal_id: 1 }),
        LoggedOperation::new(
            bob(),
            15 + 3 * DAY,
            Operation::RemoveLiquidity {
                pool,
                shares: amount(1_000),
            },
        ),
    ]
}

#[test]
fn test_replay_is_deterministic() {
    let log = market_log();

    let mut first = PoolManager::new().with_genesis(alice(), 0).unwrap();
    let mut second = PoolManager::new().with_genesis(alice(), 0).unwrap();
    let results = first.replay(&log);
    assert_eq!(second.replay(&log), results);
    assert_eq!(first.state_root(), second.state_root());
    assert_eq!(first.take_events(), second.take_events());

    assert!(matches!(results[0], Ok(Outcome::PairCreated(_))));
    assert!(matches!(results[3], Err(DexError::Expired { .. })));
    assert_eq!(results[6], Ok(Outcome::Executed(ProposalAction::SetFeeBps(50))));
    assert!(results.iter().filter(|r| r.is_err()).count() == 1);
    assert_eq!(first.config().fee_bps, 50);

    // a different history gives a different root
    let mut third = PoolManager::new().with_genesis(alice(), 0).unwrap();
    third.replay(&log[..log.len() - 1]);
    assert_ne!(third.state_root(), first.state_root());
}
