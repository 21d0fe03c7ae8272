use crate::{ALICE, COLLECTION, Environment, EnvironmentConfig, SENDER, TOKEN};
use alloy::primitives::U256;
use transfer_engine::{
    transfer::InvalidReason,
    types::{Asset, NftStandard},
};

#[tokio::test(flavor = "multi_thread")]
async fn native_without_recipient_uses_minimum() -> eyre::Result<()> {
    let env = Environment::setup_with_config(EnvironmentConfig {
        gas: Some(30_000),
        ..Default::default()
    })
    .await?;
    assert_eq!(env.snapshot().state.gas_limit, 21_000);
    assert!(env.mainnet.estimates().is_empty());

    env.engine.set_recipient(ALICE.to_string()).await;
    assert_eq!(env.snapshot().state.gas_limit, 30_000);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn token_estimate_is_doubled() -> eyre::Result<()> {
    let env = Environment::setup_with_config(EnvironmentConfig {
        asset: Some(Asset::token(TOKEN, 6, "USDC")),
        gas: Some(45_000),
        ..Default::default()
    })
    .await?;
    assert_eq!(env.snapshot().state.gas_limit, 90_000);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn token_estimate_falls_back() -> eyre::Result<()> {
    let env = Environment::setup_with_config(EnvironmentConfig {
        asset: Some(Asset::token(TOKEN, 6, "USDC")),
        gas: None,
        ..Default::default()
    })
    .await?;
    let state = env.snapshot().state;
    assert_eq!(state.gas_limit, 150_000);
    assert_eq!(state.gas_error, None);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn erc1155_estimate_falls_back() -> eyre::Result<()> {
    let env = Environment::setup_with_config(EnvironmentConfig {
        asset: Some(Asset::nft(COLLECTION, U256::from(7), NftStandard::Erc1155)),
        gas: None,
        ..Default::default()
    })
    .await?;
    assert_eq!(env.snapshot().state.gas_limit, 100_000);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn erc721_estimate_failure_invalidates() -> eyre::Result<()> {
    let env = Environment::setup_with_config(EnvironmentConfig {
        asset: Some(Asset::nft(COLLECTION, U256::from(7), NftStandard::Erc721)),
        gas: None,
        ..Default::default()
    })
    .await?;
    env.mainnet.set_nft_owner(SENDER);
    env.engine.refresh_balance().await?;
    env.engine.set_priority_fee("2").await?;
    env.engine.set_recipient(ALICE.to_string()).await;

    let snapshot = env.snapshot();
    assert_eq!(snapshot.state.asset_balance, U256::from(1));
    assert_eq!(snapshot.state.gas_limit, 0);
    assert!(snapshot.state.gas_error.is_some());
    assert_eq!(snapshot.derived.invalid_reason, Some(InvalidReason::GasEstimationFailed));

    env.mainnet.set_gas(Some(60_000));
    env.engine.set_recipient(ALICE.to_string()).await;
    let snapshot = env.snapshot();
    assert_eq!(snapshot.state.gas_limit, 60_000);
    assert_eq!(snapshot.state.gas_error, None);
    assert!(snapshot.derived.is_valid);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn nft_requires_ownership() -> eyre::Result<()> {
    let env = Environment::setup_with_config(EnvironmentConfig {
        asset: Some(Asset::nft(COLLECTION, U256::from(7), NftStandard::Erc721)),
        gas: Some(60_000),
        ..Default::default()
    })
    .await?;
    env.engine.set_priority_fee("2").await?;
    env.engine.set_recipient(ALICE.to_string()).await;
    assert_eq!(env.snapshot().derived.invalid_reason, Some(InvalidReason::NotOwner));

    env.mainnet.set_nft_owner(SENDER);
    env.engine.refresh_balance().await?;
    assert!(env.snapshot().derived.is_valid);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn nft_validity_includes_fee() -> eyre::Result<()> {
    let env = Environment::setup_with_config(EnvironmentConfig {
        asset: Some(Asset::nft(COLLECTION, U256::from(7), NftStandard::Erc1155)),
        native_balance: U256::from(1),
        gas: Some(60_000),
        ..Default::default()
    })
    .await?;
    env.mainnet.set_erc1155_balance(U256::from(3));
    env.engine.refresh_balance().await?;
    env.engine.set_priority_fee("2").await?;
    env.engine.set_recipient(ALICE.to_string()).await;

    let derived = env.snapshot().derived;
    assert!(derived.insufficient_fee);
    assert!(!derived.is_valid);
    assert_eq!(derived.invalid_reason, Some(InvalidReason::InsufficientFee));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn selecting_asset_keeps_amount() -> eyre::Result<()> {
    let env = Environment::setup_with_config(EnvironmentConfig {
        token_balance: U256::from(5_000_000),
        ..Default::default()
    })
    .await?;
    env.engine.set_amount("1.5").await;

    let usdc = Asset::token(TOKEN, 6, "USDC");
    env.engine.select_asset(usdc.clone()).await;
    let state = env.snapshot().state;
    assert_eq!(state.asset, usdc);
    assert_eq!(state.amount_text, "1.5");
    assert_eq!(state.amount, Some(U256::from(1_500_000)));
    assert_eq!(state.asset_balance, U256::from(5_000_000));

    env.engine.set_asset(Asset::native("ETH")).await;
    let state = env.snapshot().state;
    assert_eq!(state.amount_text, "");
    assert_eq!(state.amount, None);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn select_asset_by_id_falls_back_to_first() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    let usdc = Asset::token(TOKEN, 6, "USDC");
    let assets = [Asset::native("ETH"), usdc.clone()];

    env.engine.select_asset_by_id(&assets, &TOKEN.to_string().to_lowercase()).await;
    assert_eq!(env.snapshot().state.asset, usdc);

    env.engine.select_asset_by_id(&assets, "unknown").await;
    assert_eq!(env.snapshot().state.asset, Asset::native("ETH"));

    env.engine.select_asset_by_id(&[], "unknown").await;
    assert_eq!(env.snapshot().state.asset, Asset::native("ETH"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn manual_gas_limit_is_kept_until_reestimated() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    env.fill("1").await?;
    env.engine.set_gas_limit(50_000).await;
    assert_eq!(env.snapshot().state.gas_limit, 50_000);

    env.engine.set_amount("2").await;
    assert_eq!(env.snapshot().state.gas_limit, 21_000);
    Ok(())
}
