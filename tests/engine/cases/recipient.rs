use crate::{ALICE, BOB, Environment, EnvironmentConfig, POLYGON};
use alloy::primitives::address;
use std::time::Duration;
use transfer_engine::transfer::InvalidReason;

#[tokio::test(flavor = "multi_thread")]
async fn address_applies_immediately() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    env.engine.set_recipient(" 0xb0b0000000000000000000000000000000000000 ").await;

    let state = env.snapshot().state;
    assert_eq!(state.resolved_address, Some(BOB));
    assert!(!state.is_name_resolution);
    assert!(!state.is_resolving_recipient);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn name_resolves() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    env.engine.set_recipient("alice.eth").await;

    let state = env.snapshot().state;
    assert_eq!(state.resolved_address, Some(ALICE));
    assert!(state.is_name_resolution);
    assert!(!state.is_resolving_recipient);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn unresolved_name_leaves_no_recipient() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    env.fill("1").await?;
    assert!(env.snapshot().derived.is_valid);

    env.engine.set_recipient("nobody.eth").await;
    let snapshot = env.snapshot();
    assert_eq!(snapshot.state.resolved_address, None);
    assert!(!snapshot.state.is_resolving_recipient);
    assert_eq!(snapshot.derived.invalid_reason, Some(InvalidReason::NoRecipient));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_resolution_leaves_no_recipient() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    env.fill("1").await?;
    env.mainnet.fail_names(true);

    env.engine.set_recipient("alice.eth").await;
    let snapshot = env.snapshot();
    assert_eq!(snapshot.state.resolved_address, None);
    assert!(!snapshot.state.is_resolving_recipient);
    assert!(!snapshot.derived.is_valid);
    assert_eq!(snapshot.derived.invalid_reason, Some(InvalidReason::NoRecipient));

    env.mainnet.fail_names(false);
    env.engine.set_recipient("alice.eth").await;
    assert_eq!(env.snapshot().state.resolved_address, Some(ALICE));
    Ok(())
}

/// Resolution carries on when the caller stops waiting for it.
#[tokio::test(flavor = "multi_thread")]
async fn abandoned_resolution_completes() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    let release = env.mainnet.hold("alice.eth");

    let resolving =
        tokio::time::timeout(Duration::from_millis(200), env.engine.set_recipient("alice.eth"))
            .await;
    assert!(resolving.is_err());
    assert!(env.snapshot().state.is_resolving_recipient);

    let _ = release.send(());
    let snapshot = env.wait_for(|s| !s.state.is_resolving_recipient).await?;
    assert_eq!(snapshot.state.resolved_address, Some(ALICE));
    assert!(snapshot.state.is_name_resolution);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn mixed_case_address_needs_checksum() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    // valid address with one character's case flipped
    env.engine.set_recipient("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96046").await;
    assert_eq!(env.snapshot().state.resolved_address, None);
    assert!(env.snapshot().state.is_name_resolution);

    env.engine.set_recipient("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045").await;
    assert_eq!(
        env.snapshot().state.resolved_address,
        Some(address!("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045"))
    );
    Ok(())
}

/// A resolution that finishes after a newer one was requested is discarded.
#[tokio::test(flavor = "multi_thread")]
async fn superseded_resolution_is_discarded() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    env.mainnet.with_name("slow.eth", BOB);
    let release = env.mainnet.hold("slow.eth");

    let engine = env.engine.clone();
    let slow = tokio::spawn(async move { engine.set_recipient("slow.eth").await });
    env.wait_for(|s| s.state.recipient_input == "slow.eth" && s.state.is_resolving_recipient)
        .await?;

    env.engine.set_recipient("alice.eth").await;
    assert_eq!(env.snapshot().state.resolved_address, Some(ALICE));

    let _ = release.send(());
    slow.await?;

    let state = env.snapshot().state;
    assert_eq!(state.recipient_input, "alice.eth");
    assert_eq!(state.resolved_address, Some(ALICE));
    assert!(!state.is_resolving_recipient);
    Ok(())
}

/// Typing an address while a name resolves wins over the late resolution.
#[tokio::test(flavor = "multi_thread")]
async fn address_supersedes_pending_name() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    let release = env.mainnet.hold("alice.eth");

    let engine = env.engine.clone();
    let pending = tokio::spawn(async move { engine.set_recipient("alice.eth").await });
    env.wait_for(|s| s.state.is_resolving_recipient).await?;

    env.engine.set_recipient(BOB.to_string()).await;
    let _ = release.send(());
    pending.await?;

    let state = env.snapshot().state;
    assert_eq!(state.resolved_address, Some(BOB));
    assert!(!state.is_name_resolution);
    assert!(!state.is_resolving_recipient);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn recipient_change_reestimates_gas() -> eyre::Result<()> {
    let env = Environment::setup().await?;
    let before = env.mainnet.estimates().len();

    env.engine.set_recipient("alice.eth").await;
    let estimates = env.mainnet.estimates();
    assert_eq!(estimates.len(), before + 1);
    assert_eq!(estimates.last().and_then(|tx| tx.to).and_then(|to| to.to().copied()), Some(ALICE));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn recent_recipients_are_loaded() -> eyre::Result<()> {
    let env = Environment::setup_with_config(EnvironmentConfig {
        recipients: vec![transfer_engine::types::RecentRecipient::new("alice.eth")],
        chain_id: POLYGON,
        ..Default::default()
    })
    .await?;
    let names: Vec<_> = env.engine.recent_recipients().into_iter().map(|r| r.name).collect();
    assert_eq!(names, ["alice.eth"]);
    Ok(())
}
