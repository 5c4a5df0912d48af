//! ATM Test Suite: operation protocol against a simulated chain
//!
//! 1. Session lifecycle (no provider, existing accounts, idempotent connect)
//! 2. Deposit / withdraw: one sync and one notification per success
//! 3. Donate: validation order, minimum, record snapshot
//! 4. Ledger failures: failure notification, no state change
//! 5. In-flight guard

use beeatm::sim::{SimulatedLedger, SimulatedWallet, TEST_ACCOUNT};
use beeatm::{Atm, AtmConfig, AtmError, OperationKind, SessionPhase, WalletProvider, MIN_DONATION, ONE_UNIT};
use serde_json::json;
use std::sync::Arc;

fn atm_with(wallet: SimulatedWallet) -> Atm {
    Atm::new(AtmConfig::default(), Some(Arc::new(wallet) as Arc<dyn WalletProvider>))
}

async fn bound_atm(balance_units: u128) -> (Atm, SimulatedLedger) {
    let ledger = SimulatedLedger::with_balance(balance_units * ONE_UNIT);
    let atm = atm_with(SimulatedWallet::new(ledger.clone()));
    assert_eq!(atm.connect().await, Ok(SessionPhase::ContractBound));
    (atm, ledger)
}

fn messages(atm: &Atm) -> Vec<String> {
    atm.notifications().into_iter().map(|n| n.message).collect()
}

// =============================================================================
// Session
// =============================================================================

#[tokio::test]
async fn connect_without_provider_is_inert() {
    let atm = Atm::new(AtmConfig::default(), None);
    assert_eq!(atm.start().await, SessionPhase::NoProvider);
    assert_eq!(atm.connect().await, Err(AtmError::ProviderUnavailable));
    assert_eq!(atm.deposit("1").await, Err(AtmError::ProviderUnavailable));
    assert_eq!(atm.donate("2", 1).await, Err(AtmError::ProviderUnavailable));
    assert_eq!(atm.session().phase, SessionPhase::NoProvider);
    assert!(atm.notifications().is_empty());
}

#[tokio::test]
async fn operations_require_bound_contract() {
    let atm = atm_with(SimulatedWallet::new(SimulatedLedger::new()));
    assert_eq!(atm.start().await, SessionPhase::ProviderDetected);
    assert_eq!(
        atm.withdraw("1").await,
        Err(AtmError::SessionNotReady { state: "provider_detected" })
    );
    assert!(matches!(atm.sync_balance().await, Err(AtmError::SessionNotReady { .. })));
}

#[tokio::test]
async fn start_restores_existing_account_and_syncs() {
    let ledger = SimulatedLedger::with_balance(7 * ONE_UNIT);
    let wallet = SimulatedWallet::new(ledger.clone()).with_existing_accounts(vec![TEST_ACCOUNT.into()]);
    let atm = atm_with(wallet.clone());

    assert_eq!(atm.start().await, SessionPhase::ContractBound);
    assert_eq!(wallet.account_requests(), 0);
    assert_eq!(atm.balance().value, Some(7 * ONE_UNIT));
    assert_eq!(ledger.stats().queries, 1);
}

#[tokio::test]
async fn connect_syncs_once_and_is_idempotent() {
    let (atm, ledger) = bound_atm(3).await;
    assert_eq!(atm.balance().display.as_deref(), Some("3 ETH"));
    assert_eq!(ledger.stats().queries, 1);

    assert_eq!(atm.connect().await, Ok(SessionPhase::ContractBound));
    assert_eq!(ledger.stats().queries, 1);
    assert_eq!(atm.session().account.unwrap().as_str(), TEST_ACCOUNT);
}

#[tokio::test]
async fn rejected_connection_keeps_state() {
    let atm = atm_with(SimulatedWallet::new(SimulatedLedger::new()).rejecting());
    atm.start().await;
    assert!(matches!(atm.connect().await, Err(AtmError::ConnectionRejected(_))));
    assert_eq!(atm.session().phase, SessionPhase::ProviderDetected);
}

// =============================================================================
// Deposit / withdraw
// =============================================================================

#[tokio::test]
async fn deposit_syncs_once_and_notifies_once() {
    let (atm, ledger) = bound_atm(0).await;
    let before = ledger.stats();

    let receipt = atm.deposit("1.5").await.unwrap();
    assert_eq!(receipt.kind, OperationKind::Deposit);
    assert_eq!(receipt.amount, ONE_UNIT + ONE_UNIT / 2);
    assert_eq!(receipt.balance, Some(ONE_UNIT + ONE_UNIT / 2));

    let after = ledger.stats();
    assert_eq!(after.queries - before.queries, 1);
    assert_eq!(after.submissions - before.submissions, 1);
    assert_eq!(messages(&atm), ["Deposited 1.5 ETH"]);
    assert_eq!(atm.balance().last_synced_at, 2);
}

#[tokio::test]
async fn withdraw_success_and_contract_side_rejection() {
    let (atm, ledger) = bound_atm(5).await;
    let before = ledger.stats();

    let receipt = atm.withdraw("2").await.unwrap();
    assert_eq!(receipt.kind, OperationKind::Withdraw);
    assert_eq!(ledger.balance(), 3 * ONE_UNIT);
    assert_eq!(atm.balance().value, Some(3 * ONE_UNIT));
    let after = ledger.stats();
    assert_eq!(after.queries - before.queries, 1);
    assert_eq!(after.submissions - before.submissions, 1);
    assert_eq!(atm.notifications().len(), 1);

    // No client-side funds check: the contract rejects, surfaced generically.
    let err = atm.withdraw("10").await.unwrap_err();
    assert!(err.is_ledger_failure());
    assert_eq!(messages(&atm), ["Withdrawn 2 ETH", "Withdrawal failed"]);
    assert_eq!(atm.balance().value, Some(3 * ONE_UNIT));
}

#[tokio::test]
async fn malformed_amount_never_reaches_ledger() {
    let (atm, ledger) = bound_atm(1).await;
    let before = ledger.stats();
    assert!(matches!(atm.deposit("abc").await, Err(AtmError::MalformedAmount(_))));
    assert!(matches!(atm.withdraw("-1").await, Err(AtmError::MalformedAmount(_))));
    assert_eq!(ledger.stats(), before);
    assert!(atm.notifications().is_empty());
}

// =============================================================================
// Donate
// =============================================================================

#[tokio::test]
async fn donate_to_save_the_children() {
    let (atm, ledger) = bound_atm(0).await;
    let before = ledger.stats();

    let receipt = atm.donate("2", 1).await.unwrap();
    assert_eq!(receipt.campaign_id, Some(1));
    assert_eq!(ledger.balance(), 2 * ONE_UNIT);
    let after = ledger.stats();
    assert_eq!(after.queries - before.queries, 1);
    assert_eq!(after.submissions - before.submissions, 1);
    assert_eq!(atm.notifications().len(), 1);

    let donations = atm.donations();
    assert_eq!(donations.len(), 1);
    assert_eq!(donations[0].campaign_id, 1);
    assert_eq!(donations[0].campaign_name, "Save the Children");
    assert_eq!(donations[0].amount, 2 * ONE_UNIT);
    assert_eq!(messages(&atm), ["Donated 2 ETH to Save the Children"]);
    assert_eq!(atm.donated_to(1), 2 * ONE_UNIT);
}

#[tokio::test]
async fn donate_below_minimum_is_rejected_without_ledger_call() {
    let (atm, ledger) = bound_atm(0).await;
    let before = ledger.stats();

    assert!(matches!(atm.donate("0.5", 1).await, Err(AtmError::BelowMinimumDonation { .. })));
    assert!(matches!(atm.donate("0.999999999999999999", 2).await, Err(AtmError::BelowMinimumDonation { .. })));
    assert!(atm.donations().is_empty());
    assert!(atm.notifications().is_empty());
    assert_eq!(ledger.stats(), before);

    // exactly one whole unit is enough
    atm.donate("1", 2).await.unwrap();
}

#[tokio::test]
async fn donate_checks_campaign_before_amount() {
    let (atm, ledger) = bound_atm(0).await;
    let before = ledger.stats();

    assert_eq!(atm.donate("5", 99).await, Err(AtmError::InvalidCampaign(99)));
    // unknown campaign wins over a too-small or malformed amount
    assert_eq!(atm.donate("0.5", 99).await, Err(AtmError::InvalidCampaign(99)));
    assert_eq!(atm.donate("junk", 0).await, Err(AtmError::InvalidCampaign(0)));
    assert_eq!(ledger.stats(), before);
    assert!(atm.donations().is_empty());
}

#[tokio::test]
async fn donation_minimum_is_fixed_at_one_unit() {
    assert_eq!(MIN_DONATION, ONE_UNIT);

    // a stray environment override has no effect on the minimum
    std::env::set_var("BEEATM_MIN_DONATION", "0.5");
    let config = AtmConfig::from_env().unwrap();
    std::env::remove_var("BEEATM_MIN_DONATION");

    let ledger = SimulatedLedger::new();
    let atm = Atm::new(config, Some(Arc::new(SimulatedWallet::new(ledger.clone())) as Arc<dyn WalletProvider>));
    atm.connect().await.unwrap();
    assert_eq!(
        atm.donate("0.5", 1).await,
        Err(AtmError::BelowMinimumDonation { minimum: "1 ETH".into() })
    );
    assert!(atm.donations().is_empty());
    assert_eq!(ledger.balance(), 0);
}

#[tokio::test]
async fn donation_history_filters_by_campaign() {
    let (atm, _ledger) = bound_atm(0).await;
    atm.donate("1", 1).await.unwrap();
    atm.donate("2", 2).await.unwrap();
    atm.donate("3", 1).await.unwrap();

    assert_eq!(atm.donations().len(), 3);
    let for_one = atm.donations_for(1);
    assert_eq!(for_one.iter().map(|d| d.amount).collect::<Vec<_>>(), [ONE_UNIT, 3 * ONE_UNIT]);
    assert_eq!(atm.donated_to(1), 4 * ONE_UNIT);
}

// =============================================================================
// Ledger failures
// =============================================================================

#[tokio::test]
async fn submission_failure_appends_failure_notification_only() {
    let (atm, ledger) = bound_atm(2).await;
    let synced = atm.balance().last_synced_at;

    ledger.fail_next_submission();
    let err = atm.donate("1", 1).await.unwrap_err();
    assert!(matches!(err, AtmError::Submission(_)));
    assert!(atm.donations().is_empty());
    assert_eq!(messages(&atm), ["Donation failed"]);
    assert_eq!(atm.balance().last_synced_at, synced);
}

#[tokio::test]
async fn confirmation_failure_leaves_balance_untouched() {
    let (atm, ledger) = bound_atm(2).await;
    ledger.fail_next_confirmation();
    assert!(matches!(atm.deposit("1").await, Err(AtmError::Confirmation(_))));
    assert_eq!(ledger.balance(), 2 * ONE_UNIT);
    assert_eq!(atm.balance().value, Some(2 * ONE_UNIT));
    assert_eq!(messages(&atm), ["Deposit failed"]);

    // system stays usable
    atm.deposit("1").await.unwrap();
    assert_eq!(messages(&atm), ["Deposit failed", "Deposited 1 ETH"]);
}

#[tokio::test]
async fn refresh_failure_after_confirmation_still_succeeds() {
    let (atm, ledger) = bound_atm(0).await;
    ledger.fail_next_query();
    let receipt = atm.donate("1", 4).await.unwrap();
    assert_eq!(receipt.balance, None);
    assert_eq!(atm.donations().len(), 1);
    assert_eq!(messages(&atm), ["Donated 1 ETH to Educate Every Child"]);
    assert_eq!(atm.sync_balance().await, Ok(ONE_UNIT));
}

// =============================================================================
// Notifications, visibility, snapshots
// =============================================================================

#[tokio::test]
async fn clear_then_append_leaves_one_notification() {
    let (atm, _ledger) = bound_atm(5).await;
    atm.deposit("1").await.unwrap();
    atm.withdraw("1").await.unwrap();
    atm.clear_notifications();
    assert!(atm.notifications().is_empty());
    atm.deposit("1").await.unwrap();
    let entries = atm.notifications();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].sequence, 2);
}

#[tokio::test]
async fn visibility_toggle_masks_without_changing_value() {
    let (atm, _ledger) = bound_atm(4).await;
    assert!(atm.toggle_balance_visibility());
    let hidden = atm.balance();
    assert_eq!(hidden.display.as_deref(), Some("******"));
    assert_eq!(hidden.value, None);
    assert!(!atm.toggle_balance_visibility());
    assert_eq!(atm.balance().value, Some(4 * ONE_UNIT));
}

#[tokio::test]
async fn snapshot_serializes_for_renderer() {
    let (atm, _ledger) = bound_atm(0).await;
    atm.donate("2", 1).await.unwrap();
    let value = serde_json::to_value(atm.snapshot()).unwrap();
    assert_eq!(value["session"]["phase"], json!("contract_bound"));
    assert_eq!(value["session"]["account"], json!(TEST_ACCOUNT));
    assert_eq!(value["balance"]["display"], json!("2 ETH"));
    assert_eq!(value["campaigns"].as_array().unwrap().len(), 5);
    assert_eq!(value["donations"][0]["campaign_name"], json!("Save the Children"));
    assert_eq!(value["notifications"][0]["message"], json!("Donated 2 ETH to Save the Children"));
    assert_eq!(value["in_flight"], json!(null));
}

#[tokio::test]
async fn campaign_info_text() {
    let atm = Atm::new(AtmConfig::default(), None);
    let info = atm.campaign_info(2).unwrap();
    assert!(info.starts_with("Clean Water Project\nGoal: 150 ETH\n"));
    assert!(atm.campaign_info(6).is_none());
}

// =============================================================================
// In-flight guard
// =============================================================================

#[tokio::test]
async fn second_operation_rejected_while_first_in_flight() {
    let (atm, ledger) = bound_atm(5).await;
    let atm = Arc::new(atm);
    ledger.pause_confirmations();

    let first = {
        let atm = atm.clone();
        tokio::spawn(async move { atm.deposit("1").await })
    };
    while ledger.pending() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(atm.in_flight(), Some(OperationKind::Deposit));

    let before = ledger.stats();
    assert_eq!(atm.withdraw("1").await, Err(AtmError::OperationInFlight(OperationKind::Deposit)));
    assert_eq!(atm.donate("2", 1).await, Err(AtmError::OperationInFlight(OperationKind::Deposit)));
    assert_eq!(ledger.stats(), before);

    ledger.release_confirmations();
    first.await.unwrap().unwrap();
    assert_eq!(atm.in_flight(), None);
    assert_eq!(messages(&atm), ["Deposited 1 ETH"]);

    // slot released: next operation proceeds
    atm.withdraw("1").await.unwrap();
    assert_eq!(ledger.balance(), 5 * ONE_UNIT);
}

#[tokio::test]
async fn guard_released_after_failure() {
    let (atm, ledger) = bound_atm(0).await;
    ledger.fail_next_submission();
    assert!(atm.deposit("1").await.is_err());
    assert_eq!(atm.in_flight(), None);
    assert!(atm.deposit("x").await.is_err());
    assert_eq!(atm.in_flight(), None);
    atm.deposit("1").await.unwrap();
}
