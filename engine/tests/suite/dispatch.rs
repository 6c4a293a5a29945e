//! Manual trigger through the full reply pipeline.

use std::time::Duration;

use chesspilot_engine::types::{CastlingRights, Color, Placement};
use chesspilot_engine::{ExecutionOutcome, PilotError, PilotSettings, SidePreference, play_move};

use crate::common::{
    AFTER_E4, AFTER_E4_E5, ActOutcome, FakeActuator, FakeBoard, FakeOracle, START, harness, reading, settings,
};

fn white_at_start(oracle: std::sync::Arc<FakeOracle>, act: ActOutcome) -> crate::common::Harness {
    let board = FakeBoard::showing(reading(START, Color::White));
    let actuator = FakeActuator::new(board.clone(), act);
    harness(
        settings(SidePreference::Fixed(Color::White)),
        board,
        oracle,
        actuator,
    )
}

#[tokio::test(start_paused = true)]
async fn manual_move_plays_and_records_our_placement() {
    let h = white_at_start(FakeOracle::suggesting("e2e4"), ActOutcome::Land);

    let outcome = play_move(&h.session).await.unwrap();

    assert!(matches!(outcome, ExecutionOutcome::Success { attempts: 1, mate: false }));
    assert_eq!(
        h.status.lines(),
        vec!["Processing move...".to_string(), "Move Played: e2e4".to_string()]
    );
    assert_eq!(
        h.session.tracker().memory().get(Color::White),
        Some(&Placement::parse(AFTER_E4).unwrap())
    );
    let requests = h.actuator.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].from.y > requests[0].to.y, "e2 sits below e4 on screen");
    assert!(!h.session.guard().is_busy());
}

#[tokio::test(start_paused = true)]
async fn unregistered_move_exhausts_retries_and_stops_auto() {
    let h = white_at_start(FakeOracle::suggesting("e2e4"), ActOutcome::Ignore);
    h.flags().set_auto_mode(true);

    let outcome = play_move(&h.session).await.unwrap();

    match outcome {
        ExecutionOutcome::Failure {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert!(matches!(last_error, PilotError::ExhaustedRetries { attempts: 3, .. }));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(h.actuator.requests().len(), 3);
    assert_eq!(
        h.status.lines().last().map(String::as_str),
        Some("Move failed to register: e2e4")
    );
    assert!(!h.flags().auto_mode());
    assert!(!h.session.guard().is_busy());
}

#[tokio::test(start_paused = true)]
async fn third_attempt_can_still_succeed() {
    let board = FakeBoard::showing(reading(START, Color::White));
    let actuator = FakeActuator::scripted(
        board.clone(),
        &[ActOutcome::Ignore, ActOutcome::Ignore],
        ActOutcome::Land,
    );
    let h = harness(
        settings(SidePreference::Fixed(Color::White)),
        board,
        FakeOracle::suggesting("e2e4"),
        actuator,
    );
    h.flags().set_auto_mode(true);

    let outcome = play_move(&h.session).await.unwrap();

    assert!(matches!(outcome, ExecutionOutcome::Success { attempts: 3, .. }));
    assert_eq!(h.actuator.requests().len(), 3);
    assert_eq!(h.status.count("Move Played: e2e4"), 1);
    assert!(h.flags().auto_mode());
}

#[tokio::test(start_paused = true)]
async fn actuation_error_counts_as_a_failed_attempt() {
    let board = FakeBoard::showing(reading(START, Color::White));
    let actuator = FakeActuator::scripted(board.clone(), &[ActOutcome::Error], ActOutcome::Land);
    let h = harness(
        settings(SidePreference::Fixed(Color::White)),
        board,
        FakeOracle::suggesting("e2e4"),
        actuator,
    );

    let outcome = play_move(&h.session).await.unwrap();

    assert!(matches!(outcome, ExecutionOutcome::Success { attempts: 2, .. }));
    assert_eq!(h.actuator.requests().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn move_landing_after_its_settle_window_is_not_entered_twice() {
    // Settles at 500ms; the board only changes at 550ms.
    let board = FakeBoard::showing(reading(START, Color::White));
    let actuator = FakeActuator::scripted(
        board.clone(),
        &[ActOutcome::LandAfter(Duration::from_millis(550))],
        ActOutcome::Ignore,
    );
    let h = harness(
        settings(SidePreference::Fixed(Color::White)),
        board,
        FakeOracle::suggesting("e2e4"),
        actuator,
    );
    h.flags().set_auto_mode(true);

    let outcome = play_move(&h.session).await.unwrap();

    assert!(matches!(outcome, ExecutionOutcome::Success { attempts: 2, mate: false }));
    assert_eq!(h.actuator.requests().len(), 1);
    assert_eq!(h.status.count("Move Played: e2e4"), 1);
    assert_eq!(h.board.current(), Some(reading(AFTER_E4, Color::Black)));
    assert!(h.flags().auto_mode());
}

#[tokio::test(start_paused = true)]
async fn move_landing_during_a_retry_ends_the_run() {
    // Attempt 2 acts at 600ms and observes at 1100ms; the first move lands at 1150ms.
    let board = FakeBoard::showing(reading(START, Color::White));
    let actuator = FakeActuator::scripted(
        board.clone(),
        &[ActOutcome::LandAfter(Duration::from_millis(1150))],
        ActOutcome::Ignore,
    );
    let h = harness(
        settings(SidePreference::Fixed(Color::White)),
        board,
        FakeOracle::suggesting("e2e4"),
        actuator,
    );

    let outcome = play_move(&h.session).await.unwrap();

    assert!(matches!(outcome, ExecutionOutcome::Success { attempts: 3, .. }));
    assert_eq!(h.actuator.requests().len(), 2);
    assert_eq!(h.board.current(), Some(reading(AFTER_E4, Color::Black)));
}

#[tokio::test(start_paused = true)]
async fn oracle_sees_castling_rights_until_the_board_rules_them_out() {
    let h = white_at_start(FakeOracle::suggesting("g1f3"), ActOutcome::Land);

    play_move(&h.session).await.unwrap();
    assert_eq!(
        h.oracle.fens(),
        vec![format!("{START} w KQkq - 0 1")]
    );

    // Black's king stepped off e8; White's own rights survive.
    let king_walked = "rnbq1bnr/ppppkppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR";
    h.board.set(reading(king_walked, Color::White));
    play_move(&h.session).await.unwrap();
    assert_eq!(h.session.castling().to_string(), "KQ");
    assert_eq!(
        h.oracle.fens().last().map(String::as_str),
        Some(format!("{king_walked} w KQ - 0 1").as_str())
    );

    // The king returning home does not restore them.
    h.board.set(reading(AFTER_E4_E5, Color::White));
    play_move(&h.session).await.unwrap();
    assert_eq!(
        h.oracle.fens().last().map(String::as_str),
        Some(format!("{AFTER_E4_E5} w KQ - 0 1").as_str())
    );
}

#[tokio::test(start_paused = true)]
async fn configured_castling_rights_can_be_replaced_at_runtime() {
    let board = FakeBoard::showing(reading(START, Color::White));
    let actuator = FakeActuator::new(board.clone(), ActOutcome::Land);
    let h = harness(
        PilotSettings {
            castling: "k".parse().unwrap(),
            ..settings(SidePreference::Fixed(Color::White))
        },
        board,
        FakeOracle::suggesting("e2e4"),
        actuator,
    );
    assert_eq!(h.session.castling().to_string(), "k");

    h.session.set_castling(CastlingRights::NONE);
    play_move(&h.session).await.unwrap();

    assert_eq!(h.oracle.fens(), vec![format!("{START} w - - 0 1")]);
}

#[tokio::test(start_paused = true)]
async fn mate_reports_checkmate_and_stops_auto() {
    let h = white_at_start(FakeOracle::mating("e2e4"), ActOutcome::Land);
    h.flags().set_auto_mode(true);

    let outcome = play_move(&h.session).await.unwrap();

    assert!(matches!(outcome, ExecutionOutcome::Success { mate: true, .. }));
    assert_eq!(h.status.count("Move Played: e2e4\nCheckmate!"), 1);
    assert!(!h.flags().auto_mode());
}

#[tokio::test(start_paused = true)]
async fn busy_guard_rejects_without_sensing() {
    let h = white_at_start(FakeOracle::suggesting("e2e4"), ActOutcome::Land);
    let _held = h.session.guard().try_permit().unwrap();

    let result = play_move(&h.session).await;

    assert!(matches!(result, Err(PilotError::AlreadyProcessing)));
    assert_eq!(h.board.captures(), 0);
    assert_eq!(h.oracle.calls(), 0);
    assert_eq!(h.status.lines(), vec!["Move already being processed.".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn perception_failures_report_and_release() {
    let h = white_at_start(FakeOracle::suggesting("e2e4"), ActOutcome::Land);

    h.board.fail_capture(true);
    assert!(play_move(&h.session).await.is_err());
    h.board.fail_capture(false);

    h.board.hide_board(true);
    assert!(play_move(&h.session).await.is_err());
    h.board.hide_board(false);

    h.board.queue(None);
    assert!(matches!(
        play_move(&h.session).await,
        Err(PilotError::EncodingInconsistent)
    ));

    let lines = h.status.lines();
    assert!(lines.contains(&"Screenshot capture failed.".to_string()));
    assert!(lines.contains(&"No board detected.".to_string()));
    assert!(lines.contains(&"Could not detect FEN.".to_string()));
    assert_eq!(h.oracle.calls(), 0);
    assert!(!h.session.guard().is_busy());
}

#[tokio::test(start_paused = true)]
async fn oracle_without_move_or_broken_reports_no_move() {
    for oracle in [FakeOracle::without_move(), FakeOracle::broken()] {
        let h = white_at_start(oracle, ActOutcome::Land);
        let result = play_move(&h.session).await;
        assert!(matches!(result, Err(PilotError::OracleUnavailable(_))));
        assert_eq!(h.status.count("No valid move found."), 1);
        assert!(h.actuator.requests().is_empty());
        assert!(!h.session.guard().is_busy());
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_triggers_execute_once() {
    let h = white_at_start(
        FakeOracle::slow("e2e4", Duration::from_secs(2)),
        ActOutcome::Land,
    );

    let (first, second) = tokio::join!(play_move(&h.session), play_move(&h.session));

    let rejected = [&first, &second]
        .iter()
        .filter(|r| matches!(r, Err(PilotError::AlreadyProcessing)))
        .count();
    assert_eq!(rejected, 1);
    assert_eq!(h.oracle.calls(), 1);
    assert_eq!(h.actuator.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn side_is_detected_when_unassigned() {
    let board = FakeBoard::showing(reading(START, Color::White));
    let actuator = FakeActuator::new(board.clone(), ActOutcome::Land);
    let h = harness(
        settings(SidePreference::Auto),
        board,
        FakeOracle::suggesting("e2e4"),
        actuator,
    );
    assert_eq!(h.session.perspective(), None);

    play_move(&h.session).await.unwrap();

    assert_eq!(h.session.perspective(), Some(Color::White));
}
