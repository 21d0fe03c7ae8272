use crate::{ALICE, BOB, Environment, GWEI, MAINNET, POLYGON, eventually};
use alloy::primitives::U256;
use transfer_engine::{
    error::TransferError,
    transfer::SendOutcome,
    types::{Asset, FeeFields, FeeTier, GasTiers},
};

#[tokio::test(flavor = "multi_thread")]
async fn switch_releases_previous_subscriptions() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    assert_eq!(env.feed.subscriber_count(MAINNET), 1);
    assert_eq!(env.mainnet.block_subscribers(), 1);

    env.engine.switch_chain(POLYGON).await?;
    eventually(|| env.feed.subscriber_count(MAINNET) == 0).await?;
    eventually(|| env.mainnet.block_subscribers() == 0).await?;
    assert_eq!(env.feed.subscriber_count(POLYGON), 1);
    // legacy chains have no base fee to follow
    assert_eq!(env.polygon.block_subscribers(), 0);

    env.engine.switch_chain(MAINNET).await?;
    eventually(|| env.feed.subscriber_count(POLYGON) == 0).await?;
    assert_eq!(env.feed.subscriber_count(MAINNET), 1);
    assert_eq!(env.mainnet.block_subscribers(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn switch_resets_chain_state() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    env.feed.set_tiers(POLYGON, GasTiers::new(300 * GWEI, 200 * GWEI, 100 * GWEI));
    env.polygon.set_native_balance(U256::from(5));
    env.engine.set_fee_tier(FeeTier::Rapid).await;
    env.fill("1").await?;

    env.engine.switch_chain(POLYGON).await?;
    let state = env.snapshot().state;
    assert_eq!(state.chain_id, POLYGON);
    assert!(!state.eip1559);
    assert_eq!(state.asset, Asset::native("MATIC"));
    assert_eq!(state.fee_tier, FeeTier::Rapid);
    assert_eq!(state.gas_price, 300 * GWEI);
    assert_eq!(state.nonce, Some(3));
    assert_eq!(state.native_balance, U256::from(5));
    assert_eq!(state.next_block_base_fee, None);
    assert_eq!(state.amount_text, "1");
    assert_eq!(state.resolved_address, Some(ALICE));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn switch_resolves_names_again() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    env.engine.set_recipient("alice.eth").await;
    assert_eq!(env.snapshot().state.resolved_address, Some(ALICE));

    env.engine.switch_chain(POLYGON).await?;
    assert_eq!(env.snapshot().state.resolved_address, None);

    env.polygon.with_name("alice.eth", BOB);
    env.engine.switch_chain(MAINNET).await?;
    env.engine.switch_chain(POLYGON).await?;
    assert_eq!(env.snapshot().state.resolved_address, Some(BOB));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn legacy_chain_sends_gas_price() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    env.engine.switch_chain(POLYGON).await?;
    env.engine.set_amount("1").await;
    env.engine.set_recipient(ALICE.to_string()).await;

    let SendOutcome::Submitted(request) = env.engine.send_transfer().await? else {
        eyre::bail!("transfer was not submitted");
    };
    assert_eq!(request.chain_id, POLYGON);
    assert_eq!(request.fees, FeeFields::Legacy { gas_price: 50 * GWEI });
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn unsupported_chain_changes_nothing() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    let before = env.snapshot();

    let err = env.engine.switch_chain(999).await.unwrap_err();
    assert!(matches!(err, TransferError::UnsupportedChain(999)), "{err}");
    assert_eq!(env.snapshot(), before);
    assert!(env.engine.is_subscribed().await);
    assert_eq!(env.feed.subscriber_count(MAINNET), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn dispose_releases_everything() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    let release = env.mainnet.hold("alice.eth");
    let engine = env.engine.clone();
    let pending = tokio::spawn(async move { engine.set_recipient("alice.eth").await });
    env.wait_for(|s| s.state.is_resolving_recipient).await?;

    env.engine.dispose().await;
    assert!(!env.engine.is_subscribed().await);
    eventually(|| env.feed.subscriber_count(MAINNET) == 0).await?;
    eventually(|| env.mainnet.block_subscribers() == 0).await?;

    // late responses are dropped
    let _ = release.send(());
    pending.await?;
    assert_eq!(env.snapshot().state.resolved_address, None);

    // tier updates no longer reach the session
    env.feed.set_tiers(MAINNET, GasTiers::new(1, 1, 1));
    assert_eq!(env.snapshot().state.gas_price, 50 * GWEI);
    Ok(())
}
