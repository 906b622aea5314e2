//! end-to-end escrow lifecycles through the public api

use merklock::{
    hash_secret, Amount, Balance, Error, EscrowEngine, EscrowId, EscrowParams, HashLock,
    MerkleTree, Nullifier, Window,
};

const NOW: u64 = 1_000;
const T1: u64 = 60_000;
const T2: u64 = 120_000;
const T3: u64 = 180_000;
const DEADLINE: u64 = 300_000;

const TOTAL: u64 = 1_000_000;
const REWARD: u64 = 50_000;
const PARTS: u64 = 4;

fn addr(tag: u8) -> merklock::Address {
    merklock::Address([tag; 32])
}

fn secret_set() -> Vec<Vec<u8>> {
    (1..=PARTS + 1)
        .map(|i| format!("swap-42-secret-{i}").into_bytes())
        .collect()
}

fn tree_over(secrets: &[Vec<u8>]) -> MerkleTree {
    MerkleTree::from_leaves(secrets.iter().map(|s| hash_secret(s)).collect())
}

fn lock_and_fund(
    engine: &mut EscrowEngine,
    secrets: &[Vec<u8>],
    reveal_index: u64,
) -> (EscrowId, MerkleTree) {
    let tree = tree_over(secrets);
    let params = EscrowParams {
        maker: addr(1),
        hash_lock: HashLock::of_secret(&secrets[(reveal_index - 1) as usize]),
        merkle_root: tree.root(),
        withdrawal_end: T1,
        public_withdrawal_end: T2,
        cancellation_end: T3,
        num_parts: PARTS,
        deadline: DEADLINE,
    };
    let id = engine
        .create(
            Balance::deposit(Amount::new(TOTAL)),
            Balance::deposit(Amount::new(REWARD)),
            params,
            NOW,
        )
        .unwrap();
    (id, tree)
}

#[test]
fn partial_fill_then_refund_conserves_value() {
    let mut engine = EscrowEngine::new();
    let secrets = secret_set();
    let (id, tree) = lock_and_fund(&mut engine, &secrets, 3);

    let taker = addr(9);

    // taker fills three parts during the private window
    let w = engine
        .withdraw_partial(
            &id,
            3,
            &secrets[2],
            &tree.prove(2),
            Amount::new(600_000),
            taker,
            NOW + 10,
        )
        .unwrap();
    assert_eq!(w.payout.amount(), Amount::new(600_000));
    assert_eq!(w.payout.to, taker);
    assert!(w.reward.is_none());

    let escrow = engine.escrow(&id).unwrap();
    assert_eq!(escrow.window(NOW + 10), Window::Withdrawal);
    assert_eq!(escrow.fill_percent(), 60);
    assert_eq!(escrow.max_cumulative_fill(3).unwrap(), Amount::new(750_000));

    // nobody completes; a third party cancels for the maker
    let refund = engine.refund_to_maker(&id, T2 + 500).unwrap();
    assert_eq!(refund.principal.to, addr(1));
    assert_eq!(refund.reward.to, addr(1));

    // deposited value is fully accounted for
    let paid = w.payout.amount().0 + refund.principal.amount().0 + refund.reward.amount().0;
    assert_eq!(paid, TOTAL + REWARD);
    assert!(engine.escrow(&id).is_none());
}

#[test]
fn public_resolver_completes_and_earns_reward() {
    let mut engine = EscrowEngine::new();
    let secrets = secret_set();
    let (id, tree) = lock_and_fund(&mut engine, &secrets, 5);

    let resolver = addr(7);

    // private window has passed without action; anyone may now resolve
    let now = T1 + 1_000;
    assert_eq!(engine.escrow(&id).unwrap().window(now), Window::PublicWithdrawal);

    let w = engine
        .withdraw_full(&id, 5, &secrets[4], &tree.prove(4), resolver, now)
        .unwrap();

    assert_eq!(w.payout.to, resolver);
    assert_eq!(w.payout.amount(), Amount::new(TOTAL));
    let reward = w.reward.unwrap();
    assert_eq!(reward.to, resolver);
    assert_eq!(reward.amount(), Amount::new(REWARD));

    assert!(engine.escrow(&id).is_none());
    assert!(engine.is_nullifier_used(&Nullifier::of_secret(&secrets[4])));
}

#[test]
fn expired_escrow_is_a_dead_end() {
    let mut engine = EscrowEngine::new();
    let secrets = secret_set();
    let (id, tree) = lock_and_fund(&mut engine, &secrets, 1);

    let now = T3 + 1;
    assert_eq!(engine.escrow(&id).unwrap().window(now), Window::Expired);

    assert_eq!(
        engine.withdraw_partial(
            &id,
            1,
            &secrets[0],
            &tree.prove(0),
            Amount::new(1),
            addr(9),
            now,
        ),
        Err(Error::WindowExpired)
    );
    assert_eq!(
        engine.withdraw_full(&id, 5, &secrets[4], &tree.prove(4), addr(9), now),
        Err(Error::WindowExpired)
    );
    assert_eq!(engine.refund_to_maker(&id, now), Err(Error::WindowNotActive));

    // the record survives with its funds unreachable
    let escrow = engine.escrow(&id).unwrap();
    assert_eq!(escrow.balance_amount(), Amount::new(TOTAL));
    assert_eq!(escrow.reward_amount(), Amount::new(REWARD));
}

#[test]
fn secrets_are_spent_across_escrows() {
    let mut engine = EscrowEngine::new();
    let secrets = secret_set();
    let (first, tree) = lock_and_fund(&mut engine, &secrets, 2);
    let (second, _) = lock_and_fund(&mut engine, &secrets, 2);
    assert_eq!(engine.registry().escrow_count(), 2);

    engine
        .withdraw_partial(
            &first,
            2,
            &secrets[1],
            &tree.prove(1),
            Amount::new(500_000),
            addr(9),
            NOW + 1,
        )
        .unwrap();

    // the registry is shared: the same secret is dead for the second
    // escrow even though that escrow never saw it
    assert_eq!(
        engine.withdraw_partial(
            &second,
            2,
            &secrets[1],
            &tree.prove(1),
            Amount::new(500_000),
            addr(9),
            NOW + 2,
        ),
        Err(Error::NullifierAlreadyUsed)
    );

    // the second escrow is still refundable in its cancellation window
    let refund = engine.refund_to_maker(&second, T2 + 1).unwrap();
    assert_eq!(refund.principal.amount(), Amount::new(TOTAL));
}

#[test]
fn range_fill_spans_multiple_parts() {
    let mut engine = EscrowEngine::new();

    // one secret committed at every index
    let secret = b"swap-77-repeated".to_vec();
    let tree = MerkleTree::from_leaves(vec![hash_secret(&secret); (PARTS + 1) as usize]);
    let id = engine
        .create(
            Balance::deposit(Amount::new(TOTAL)),
            Balance::deposit(Amount::new(REWARD)),
            EscrowParams {
                maker: addr(1),
                hash_lock: HashLock::of_secret(&secret),
                merkle_root: tree.root(),
                withdrawal_end: T1,
                public_withdrawal_end: T2,
                cancellation_end: T3,
                num_parts: PARTS,
                deadline: DEADLINE,
            },
            NOW,
        )
        .unwrap();

    assert_eq!(
        engine.escrow(&id).unwrap().range_fill_amount(2, 4).unwrap(),
        Amount::new(750_000)
    );

    let w = engine
        .withdraw_partial_range(
            &id,
            2,
            4,
            &secret,
            &secret,
            &tree.prove(1),
            &tree.prove(3),
            Amount::new(TOTAL),
            addr(9),
            NOW + 5,
        )
        .unwrap();
    assert_eq!(w.payout.amount(), Amount::new(750_000));

    // only the boundary reveals were nullified
    assert_eq!(engine.registry().len(), 1);
}
