//! Liquid Staking Settlement Simulation.
//!
//! Walks the engine through deposits, queued redemptions, batch settlement
//! across cascading sub-pools, fee minting, the instant-liquidity bypass and
//! emergency recovery.

use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;
use vault_settlement::*;

const DAY: u64 = 86_400;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Liquid Staking Settlement Engine Simulation");
    println!("Batched Withdrawal Queue, Cascading Sub-Pools\n");

    scenario_1_request_and_claim();
    scenario_2_cascade_across_pools();
    scenario_3_failed_tick_rollback();
    scenario_4_fee_accrual();
    scenario_5_instant_liquidity();
    scenario_6_emergency_clear();
    scenario_7_checkpoint_restore();

    println!("\nAll simulations completed successfully.");
}

fn engine_with_pools(balances: &[i64]) -> (Engine, Vec<SharedYieldSource>) {
    let mut engine = Engine::new(EngineConfig::default()).unwrap();
    let mut handles = Vec::new();
    for (i, balance) in balances.iter().enumerate() {
        let source = SharedYieldSource::new(
            InMemoryYieldSource::new(format!("pool-{i}"), assets(*balance)).with_id(PoolId(i as u32)),
        );
        engine.insert_pool(Box::new(source.clone())).unwrap();
        handles.push(source);
    }
    (engine, handles)
}

/// Request → Pending → Available → partial claims.
fn scenario_1_request_and_claim() {
    println!("Scenario 1: Withdrawal Lifecycle\n");

    let (mut engine, _) = engine_with_pools(&[0]);
    let alice = AccountId(1);

    engine.deposit(alice, assets(500)).unwrap();
    engine.request_withdraw(alice, assets(100)).unwrap();
    println!("  Alice deposits 500 and requests 100");

    match engine.tick() {
        Err(e) => println!("  Tick before the window: {}", e),
        Ok(_) => println!("  Tick unexpectedly ran"),
    }

    engine.advance_secs(DAY);
    engine.tick().unwrap();
    println!(
        "  After tick 1: pending {}, requested orders {}",
        engine.order_amount(alice, OrderPhase::Pending),
        engine.total_requested_orders()
    );

    engine.advance_secs(DAY);
    engine.tick().unwrap();
    println!("  After tick 2: available {}", engine.available_to_claim(alice));

    let claim = engine.claim(alice, assets(60), alice).unwrap();
    println!("  Claimed 60, remaining {}", claim.remaining);
    if let Err(e) = engine.claim(alice, assets(41), alice) {
        println!("  Claim 41: {}\n", e);
    }
}

/// Pools [30, 200], a 100 pull drains pool 0 and the next deposit moves on.
fn scenario_2_cascade_across_pools() {
    println!("Scenario 2: Cascade Across Pools\n");

    let (mut engine, handles) = engine_with_pools(&[0, 0]);
    let bob = AccountId(2);

    engine.deposit(bob, assets(30)).unwrap();
    // rewards land on pool 1
    handles[1].with(|s| s.accrue(assets(200)));

    let plan = engine.plan_cascade(assets(100)).unwrap();
    for leg in &plan.legs {
        println!("  Plan: {} {} (drains: {})", leg.pool, leg.amount, leg.drains);
    }

    engine.request_withdraw(bob, assets(100)).unwrap();
    engine.advance_secs(DAY);
    let report = engine.tick().unwrap();
    println!("  Pulled {} in {} legs", report.pulled, report.cascade.legs.len());

    for snapshot in engine.pool_snapshots().unwrap() {
        println!("  {}: balance {}, exhausted {}", snapshot.id, snapshot.balance, snapshot.exhausted);
    }

    let result = engine.deposit(bob, assets(50)).unwrap();
    println!("  Next deposit of 50 lands on {}\n", result.pool);
}

/// A pool whose withdraw reverts leaves the queue untouched.
fn scenario_3_failed_tick_rollback() {
    println!("Scenario 3: Failed Tick Rollback\n");

    let (mut engine, handles) = engine_with_pools(&[0, 200]);
    let carol = AccountId(3);

    engine.deposit(carol, assets(50)).unwrap();
    engine.request_withdraw(carol, assets(120)).unwrap();
    handles[1].with(|s| s.set_fail_withdraw(true));

    engine.advance_secs(DAY);
    match engine.tick() {
        Err(e) => println!("  Tick failed: {}", e),
        Ok(_) => println!("  Tick unexpectedly settled"),
    }
    println!(
        "  Still requested: {}, custody {}, pool 0 back at {}, counters consistent {}\n",
        engine.order_amount(carol, OrderPhase::Requested),
        engine.custody(),
        handles[0].with(|s| s.balance()).unwrap(),
        engine.ledger().counters_consistent()
    );
}

/// Fee accrues linearly and mints once per cooling window.
fn scenario_4_fee_accrual() {
    println!("Scenario 4: Fee Accrual\n");

    let (mut engine, _) = engine_with_pools(&[0]);
    engine.deposit(AccountId(4), assets(1_000_000)).unwrap();

    engine.advance_secs(SECONDS_PER_YEAR as u64);
    println!("  Accrued after one year: {} shares", engine.available_fee().unwrap());

    let minted = engine.mint_fee().unwrap();
    println!("  Minted {} shares to treasury {:?}", minted.shares, minted.treasury);

    engine.advance_secs(60);
    if let Err(e) = engine.mint_fee() {
        println!("  Second mint a minute later: {}\n", e);
    }
}

/// Instant redemption through a flat-fee swap pool.
fn scenario_5_instant_liquidity() {
    println!("Scenario 5: Instant Liquidity\n");

    let (mut engine, _) = engine_with_pools(&[0]);
    let dave = AccountId(5);
    engine.deposit(dave, assets(1_000)).unwrap();
    engine.attach_instant_liquidity(Box::new(FixedFeeLiquidity::new(
        AccountId(900),
        assets(10_000),
        Bps::new(30),
    )));

    let result = engine
        .instant_redeem(dave, shares(100), Assets::new(dec!(99)))
        .unwrap();
    println!("  Sold 100 shares: {} out, {} fee", result.assets_out, result.fee);
    println!("  Paid out to Dave: {}\n", engine.payouts(dave));
}

/// Paused vault writes stuck requests off the queue.
fn scenario_6_emergency_clear() {
    println!("Scenario 6: Emergency Clear\n");

    let (mut engine, _) = engine_with_pools(&[0]);
    for account in 10..15 {
        engine.deposit(AccountId(account), assets(100)).unwrap();
        engine.request_withdraw(AccountId(account), assets(25)).unwrap();
    }

    if let Err(e) = engine.emergency_clear_requested(0..2) {
        println!("  While operational: {}", e);
    }

    engine.set_mode(OperationalMode::Paused);
    let report = engine.emergency_clear_requested(0..2).unwrap();
    println!(
        "  Cleared {} orders totalling {}, {} still queued\n",
        report.cleared.len(),
        report.total,
        engine.total_requested_orders()
    );
}

/// Snapshot to JSON and back.
fn scenario_7_checkpoint_restore() {
    println!("Scenario 7: Checkpoint Restore\n");

    // wall-clock start, as a live deployment would run
    let mut engine = Engine::starting_at(
        EngineConfig::default(),
        Box::new(InMemoryShareLedger::new()),
        Timestamp::now(),
    )
    .unwrap();
    let source = SharedYieldSource::new(InMemoryYieldSource::new("pool-0", Assets::zero()));
    engine.insert_pool(Box::new(source.clone())).unwrap();
    let handles = vec![source];

    engine.deposit(AccountId(20), assets(300)).unwrap();
    engine.request_withdraw(AccountId(20), assets(75)).unwrap();

    let json = engine.snapshot().to_json().unwrap();
    println!("  Snapshot is {} bytes of JSON", json.len());

    let snapshot = VaultSnapshot::from_json(&json).unwrap();
    let sources: Vec<Box<dyn YieldSource + Send>> =
        handles.into_iter().map(|h| Box::new(h) as Box<dyn YieldSource + Send>).collect();
    let restored = Engine::restore(
        EngineConfig::default(),
        snapshot,
        sources,
        Box::new(InMemoryShareLedger::new()),
    )
    .unwrap();

    println!(
        "  Restored: {} requested, next tick at {}",
        restored.order_amount(AccountId(20), OrderPhase::Requested),
        restored.next_tick()
    );
}
