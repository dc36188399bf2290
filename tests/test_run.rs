mod mock_common;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;

use coinbine::engine::cancel::CancelToken;
use coinbine::engine::progress::{ProgressLog, ProgressSink};
use coinbine::engine::Settings;
use coinbine::error::ConsolidationError;
use coinbine::model::{LegState, RunStatus, SkipReason, SwapState, TargetSelection};
use coinbine::venues::wallet::WatchOnlyWallet;

use mock_common::*;

fn wallet() -> WatchOnlyWallet {
    WatchOnlyWallet::new(account())
}

fn usdc_on_base() -> TargetSelection {
    TargetSelection::new("USDC", BASE)
}

fn sink() -> Arc<ProgressLog> {
    Arc::new(ProgressLog::new())
}

// ── Happy path ───────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_swaps_dai_and_bridges_residue_to_base() {
    let harness = Harness::scenario();
    let orchestrator = harness.orchestrator();
    let log = sink();

    let report = orchestrator
        .run(&wallet(), &usdc_on_base(), log.clone(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert!(report.failures.is_empty());

    // exactly one swap: DAI on Arbitrum
    assert_eq!(harness.swaps.quotes(), 1);
    assert_eq!(report.swap_attempts(), 1);
    let executed = harness.swaps.executed.lock().unwrap().clone();
    assert_eq!(executed, [(ARBITRUM, "DAI".to_string())]);

    // Optimism USDC is already the target token
    let optimism_usdc = report
        .swaps
        .iter()
        .find(|s| s.chain_id == OPTIMISM && s.from_token == "USDC")
        .unwrap();
    assert_eq!(
        optimism_usdc.state,
        SwapState::Skipped { reason: SkipReason::AlreadyTarget }
    );

    // one bridge step, one leg per non-target chain holding USDC
    let bridge = report.bridge.as_ref().unwrap();
    assert!(bridge.success());
    let legs: Vec<(u64, U256)> = bridge.legs.iter().map(|l| (l.source_chain_id, l.amount)).collect();
    assert_eq!(legs, [(OPTIMISM, units(100, 6)), (ARBITRUM, units(50, 6))]);
    let requests = harness.bridge.requests.lock().unwrap().clone();
    assert!(requests.iter().all(|r| r.target.chain_id == BASE));
    assert!(requests.iter().all(|r| r.target_token == usdc_on(BASE)));

    // progress ends with exactly one summary line
    let messages = log.messages();
    let summaries: Vec<&String> = messages.iter().filter(|m| m.starts_with("Run finished")).collect();
    assert_eq!(summaries.len(), 1);
    assert_eq!(messages.last(), summaries.last().copied());
    assert!(summaries[0].contains("COMPLETED"));
    assert_eq!(report.events.len(), messages.len());
}

#[tokio::test]
async fn nothing_off_target_makes_bridge_a_noop() {
    let harness = Harness::with_chains(
        MockChain::new(),
        MockChain::new().with_token(usdc_on(BASE), units(5, 6), 6),
        MockChain::new(),
    );
    let orchestrator = harness.orchestrator();

    let report = orchestrator
        .run(&wallet(), &usdc_on_base(), sink(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(harness.swaps.quotes(), 0);
    assert!(report.bridge.as_ref().unwrap().is_noop());
    assert_eq!(harness.bridge.calls(), 0);
}

#[tokio::test]
async fn status_is_observable() {
    let harness = Harness::scenario();
    let orchestrator = harness.orchestrator();
    let status = orchestrator.subscribe();
    assert_eq!(*status.borrow(), RunStatus::Idle);

    orchestrator
        .run(&wallet(), &usdc_on_base(), sink(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(*status.borrow(), RunStatus::Completed);
    assert!(orchestrator.status().is_terminal());
}

// ── Swap ordering ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn swaps_serialize_per_chain_and_overlap_across_chains() {
    let harness = Harness::with_chains(
        MockChain::new()
            .with_native(units(1, 18))
            .with_token(usdc_on(OPTIMISM), U256::ZERO, 6)
            .with_token(dai_on(OPTIMISM), units(10, 18), 18),
        MockChain::new().with_token(usdc_on(BASE), U256::ZERO, 6),
        MockChain::new()
            .with_native(units(2, 18))
            .with_token(usdc_on(ARBITRUM), U256::ZERO, 6)
            .with_token(dai_on(ARBITRUM), units(50, 18), 18),
    )
    .swaps(MockSwapVenue::new().slow(Duration::from_secs(30)));
    let orchestrator = harness.orchestrator_with(Settings {
        swap_native: true,
        ..Settings::default()
    });

    let report = orchestrator
        .run(&wallet(), &usdc_on_base(), sink(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    // ETH and DAI on each of Optimism and Arbitrum
    assert_eq!(report.swap_attempts(), 4);
    assert_eq!(harness.swaps.peak_on(OPTIMISM), 1);
    assert_eq!(harness.swaps.peak_on(ARBITRUM), 1);
    assert!(harness.swaps.peak_overall() > 1);

    // within a chain, entries keep their group order
    let executed = harness.swaps.executed.lock().unwrap().clone();
    let on = |chain: u64| -> Vec<String> {
        executed.iter().filter(|(c, _)| *c == chain).map(|(_, t)| t.clone()).collect()
    };
    assert_eq!(on(OPTIMISM), ["ETH", "DAI"]);
    assert_eq!(on(ARBITRUM), ["ETH", "DAI"]);
}

// ── Isolated failures ────────────────────────────────────────────────

#[tokio::test]
async fn swap_failure_does_not_stop_other_swaps() {
    let harness = Harness::with_chains(
        MockChain::new().with_token(dai_on(OPTIMISM), units(10, 18), 18),
        MockChain::new(),
        MockChain::new()
            .with_token(usdc_on(ARBITRUM), U256::ZERO, 6)
            .with_token(dai_on(ARBITRUM), units(50, 18), 18),
    )
    .swaps(MockSwapVenue::new().reverting(OPTIMISM, "DAI"));
    let orchestrator = harness.orchestrator();

    let report = orchestrator
        .run(&wallet(), &usdc_on_base(), sink(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::CompletedWithPartialFailures);
    assert_eq!(report.swap_attempts(), 2);

    let failed: Vec<_> = report.swaps.iter().filter(|s| s.error().is_some()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].chain_id, OPTIMISM);
    assert!(report.swaps.iter().any(|s| s.chain_id == ARBITRUM && s.success()));

    // only the successful output is bridged
    let bridge = report.bridge.as_ref().unwrap();
    assert_eq!(bridge.legs.len(), 1);
    assert_eq!(bridge.legs[0].source_chain_id, ARBITRUM);

    assert_eq!(report.failures.len(), 1);
    let summary = report.messages().last().unwrap().to_string();
    assert!(summary.contains("COMPLETED_WITH_PARTIAL_FAILURES"));
    assert!(summary.contains("transaction reverted"));
}

#[tokio::test]
async fn missing_route_is_reported_as_no_route() {
    let harness = Harness::scenario().swaps(MockSwapVenue::new().without_route(ARBITRUM, "DAI"));
    let orchestrator = harness.orchestrator();

    let report = orchestrator
        .run(&wallet(), &usdc_on_base(), sink(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::CompletedWithPartialFailures);
    let dai = report.swaps.iter().find(|s| s.from_token == "DAI" && s.attempted()).unwrap();
    assert!(dai.error().unwrap().starts_with("no route"));
    assert_eq!(harness.swaps.executions.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreachable_chain_degrades_to_partial_failure() {
    let harness = Harness::with_chains(
        MockChain::new().with_token(usdc_on(OPTIMISM), units(100, 6), 6),
        MockChain::new(),
        MockChain::down(),
    );
    let orchestrator = harness.orchestrator();

    let report = orchestrator
        .run(&wallet(), &usdc_on_base(), sink(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::CompletedWithPartialFailures);
    assert!(report.failures.iter().all(|f| f.starts_with("arbitrum")));
    // native + USDC + DAI reads on arbitrum
    assert_eq!(report.failures.len(), 3);
    assert_eq!(report.bridge.as_ref().unwrap().landed_legs().count(), 1);
}

// ── Run-terminal failures ────────────────────────────────────────────

#[tokio::test]
async fn all_chains_down_fails_without_swaps_or_bridges() {
    let harness =
        Harness::with_chains(MockChain::down(), MockChain::down(), MockChain::down());
    let orchestrator = harness.orchestrator();
    let log = sink();

    let report = orchestrator
        .run(&wallet(), &usdc_on_base(), log.clone(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    assert!(report.abort_reason.as_deref().unwrap().contains("every chain"));
    assert_eq!(harness.swaps.quotes(), 0);
    assert_eq!(harness.bridge.calls(), 0);
    assert!(report.bridge.is_none());
    assert!(log.messages().last().unwrap().starts_with("Run finished: FAILED"));
}

#[tokio::test]
async fn bridge_failure_fails_run_and_lists_retained_funds() {
    let harness = Harness::scenario().bridge(MockBridgeVenue::new().failing_from(OPTIMISM));
    let orchestrator = harness.orchestrator();

    let report = orchestrator
        .run(&wallet(), &usdc_on_base(), sink(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    let bridge = report.bridge.as_ref().unwrap();
    assert!(matches!(bridge.legs[0].state, LegState::Failed { .. }));
    assert_eq!(bridge.legs[1].state, LegState::NotAttempted);
    assert_eq!(harness.bridge.calls(), 1);

    // nothing is reported lost: every leg's funds are accounted as retained
    assert_eq!(
        bridge.retained(),
        [(OPTIMISM, units(100, 6)), (ARBITRUM, units(50, 6))]
    );
    assert!(report.abort_reason.as_deref().unwrap().contains("bridge relayer rejected"));
    assert!(report.messages().iter().any(|m| m.starts_with("Funds retained on arbitrum: 50")));
}

#[tokio::test]
async fn second_leg_failure_keeps_first_leg_landed() {
    let harness = Harness::scenario().bridge(MockBridgeVenue::new().failing_from(ARBITRUM));
    let orchestrator = harness.orchestrator();

    let report = orchestrator
        .run(&wallet(), &usdc_on_base(), sink(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    let bridge = report.bridge.as_ref().unwrap();
    let landed: Vec<u64> = bridge.landed_legs().map(|l| l.source_chain_id).collect();
    assert_eq!(landed, [OPTIMISM]);
    assert_eq!(bridge.retained(), [(ARBITRUM, units(50, 6))]);
}

#[tokio::test]
async fn target_token_missing_on_target_chain_is_configuration_failure() {
    let harness = Harness::scenario();
    let orchestrator = harness.orchestrator();

    let report = orchestrator
        .run(&wallet(), &TargetSelection::new("DAI", BASE), sink(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    assert!(report.abort_reason.as_deref().unwrap().starts_with("configuration error"));
    assert_eq!(harness.chain_calls(), 0);
}

#[tokio::test]
async fn unknown_target_chain_is_configuration_failure() {
    let harness = Harness::scenario();
    let orchestrator = harness.orchestrator();

    let report = orchestrator
        .run(&wallet(), &TargetSelection::new("USDC", 1), sink(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    assert!(report.abort_reason.as_deref().unwrap().contains("unknown chain id 1"));
    assert_eq!(harness.chain_calls(), 0);
}

// ── Preconditions and concurrency ────────────────────────────────────

#[tokio::test]
async fn disconnected_wallet_emits_single_event_and_does_no_work() {
    let harness = Harness::scenario();
    let orchestrator = harness.orchestrator();
    let log = sink();

    let err = orchestrator
        .run(
            &WatchOnlyWallet::disconnected(),
            &usdc_on_base(),
            log.clone(),
            &CancelToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ConsolidationError::Precondition(_)));
    assert_eq!(log.messages(), ["No wallet connected."]);
    assert_eq!(harness.chain_calls(), 0);
    assert_eq!(orchestrator.status(), RunStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn concurrent_run_for_same_account_is_rejected() {
    let harness = Harness::with_chains(
        MockChain::new()
            .with_token(usdc_on(OPTIMISM), units(1, 6), 6)
            .slow(Duration::from_millis(200)),
        MockChain::new(),
        MockChain::new(),
    );
    let orchestrator = harness.orchestrator();
    let target = usdc_on_base();
    let cancel = CancelToken::new();

    let (wallet_a, wallet_b) = (wallet(), wallet());
    let (first, second) = tokio::join!(
        orchestrator.run(&wallet_a, &target, sink(), &cancel),
        orchestrator.run(&wallet_b, &target, sink(), &cancel),
    );

    assert_eq!(first.unwrap().status, RunStatus::Completed);
    assert!(matches!(second, Err(ConsolidationError::RunInProgress(_))));

    // the claim is released once the run ends
    let again = orchestrator.run(&wallet(), &target, sink(), &cancel).await;
    assert!(again.is_ok());
}

#[tokio::test(start_paused = true)]
async fn concurrent_appends_keep_lines_whole() {
    let log = sink();
    let tasks: Vec<_> = (0..16)
        .map(|t| {
            let log = log.clone();
            tokio::spawn(async move {
                for i in 0..25 {
                    log.append(format!("task {t} line {i}"));
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }
    let messages = log.messages();
    assert_eq!(messages.len(), 400);
    assert!(messages.iter().all(|m| m.starts_with("task ") && m.contains(" line ")));
}
