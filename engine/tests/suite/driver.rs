//! Driving loop scenarios on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use chesspilot_engine::types::Color;
use chesspilot_engine::{
    CycleOutcome, DrivingLoop, PilotError, PilotSettings, STALL_NOTICE, SidePreference,
    TurnSignal, play_move,
};

use crate::common::{
    AFTER_E4, AFTER_E4_E5, ActOutcome, FakeActuator, FakeBoard, FakeOracle, Harness, START,
    harness, reading, settings, wait_until,
};

fn black_after_white_start(oracle: Arc<FakeOracle>) -> Harness {
    let board = FakeBoard::showing(reading(START, Color::White));
    let actuator = FakeActuator::new(board.clone(), ActOutcome::Land);
    harness(
        PilotSettings {
            auto_play: true,
            ..settings(SidePreference::Fixed(Color::Black))
        },
        board,
        oracle,
        actuator,
    )
}

#[tokio::test(start_paused = true)]
async fn opponent_move_triggers_one_reply() {
    let h = black_after_white_start(FakeOracle::suggesting("e7e5"));
    let handle = DrivingLoop::spawn(Arc::clone(&h.session));

    // Opponent (White) is to move; let the loop see that first.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(h.actuator.requests().is_empty());

    h.board.set(reading(AFTER_E4, Color::Black));
    let played = wait_until(Duration::from_secs(20), || {
        h.status.count("Move Played: e7e5") == 1
    })
    .await;
    assert!(played, "status lines: {:?}", h.status.lines());
    assert_eq!(
        h.board.current().map(|r| r.placement.as_str().to_string()),
        Some(AFTER_E4_E5.to_string())
    );

    // The board now sits on White's turn; no second reply follows.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.actuator.requests().len(), 1);
    assert_eq!(h.oracle.calls(), 1);

    h.flags().set_auto_mode(false);
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn busy_guard_skips_the_whole_cycle() {
    let h = black_after_white_start(FakeOracle::suggesting("e7e5"));
    let _held = h.session.guard().try_permit().unwrap();

    let outcome = DrivingLoop::new(Arc::clone(&h.session)).cycle().await;

    assert_eq!(outcome, CycleOutcome::GuardBusy);
    assert_eq!(h.board.captures(), 0);
}

#[tokio::test(start_paused = true)]
async fn cycles_classify_readings() {
    let h = black_after_white_start(FakeOracle::suggesting("e7e5"));
    let mut driver = DrivingLoop::new(Arc::clone(&h.session));

    assert_eq!(
        driver.cycle().await,
        CycleOutcome::Classified(TurnSignal::OpponentAdvanced)
    );
    assert_eq!(
        driver.cycle().await,
        CycleOutcome::Classified(TurnSignal::NoChange)
    );

    h.board.fail_capture(true);
    assert_eq!(driver.cycle().await, CycleOutcome::SenseFailed);
    h.board.fail_capture(false);

    h.board.set(reading(AFTER_E4, Color::Black));
    assert_eq!(driver.cycle().await, CycleOutcome::Dispatched);
}

#[tokio::test(start_paused = true)]
async fn turning_auto_off_stops_the_loop_promptly() {
    let h = black_after_white_start(FakeOracle::suggesting("e7e5"));
    let handle = DrivingLoop::spawn(Arc::clone(&h.session));

    tokio::time::sleep(Duration::from_secs(2)).await;
    h.flags().set_auto_mode(false);

    let stopped = tokio::time::timeout(h.session.settings().poll_interval, handle).await;
    assert!(stopped.is_ok());
}

#[tokio::test(start_paused = true)]
async fn auto_off_during_think_delay_cancels_the_reply() {
    let h = black_after_white_start(FakeOracle::suggesting("e7e5"));
    let mut driver = DrivingLoop::new(Arc::clone(&h.session));
    assert_eq!(
        driver.cycle().await,
        CycleOutcome::Classified(TurnSignal::OpponentAdvanced)
    );
    h.board.set(reading(AFTER_E4, Color::Black));

    let flags = Arc::clone(h.flags());
    let (outcome, ()) = tokio::join!(driver.cycle(), async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        flags.set_auto_mode(false);
    });

    assert_eq!(outcome, CycleOutcome::Stopped);
    assert_eq!(h.oracle.calls(), 0);
    assert!(!h.session.guard().is_busy());
}

#[tokio::test(start_paused = true)]
async fn stalled_turn_is_reported_once() {
    let board = FakeBoard::showing(reading(START, Color::White));
    let actuator = FakeActuator::new(board.clone(), ActOutcome::Land);
    let h = harness(
        PilotSettings {
            auto_play: true,
            ..settings(SidePreference::Fixed(Color::White))
        },
        board,
        FakeOracle::suggesting("e2e4"),
        actuator,
    );
    let handle = DrivingLoop::spawn(Arc::clone(&h.session));

    tokio::time::sleep(Duration::from_secs(100)).await;

    assert_eq!(h.status.count(STALL_NOTICE), 1);
    assert!(h.actuator.requests().is_empty());

    h.flags().close();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn manual_trigger_rejected_while_loop_reply_in_flight() {
    let h = black_after_white_start(FakeOracle::slow("e7e5", Duration::from_secs(3)));
    let mut driver = DrivingLoop::new(Arc::clone(&h.session));
    driver.cycle().await;
    h.board.set(reading(AFTER_E4, Color::Black));
    assert_eq!(driver.cycle().await, CycleOutcome::Dispatched);

    let manual = play_move(&h.session).await;
    assert!(matches!(manual, Err(PilotError::AlreadyProcessing)));

    let done = wait_until(Duration::from_secs(30), || !h.session.guard().is_busy()).await;
    assert!(done);
    assert_eq!(h.actuator.requests().len(), 1);
}
