//! End-to-end searches against the reference board.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use lucena_board::Board;
use lucena_core::values::{MATE_SCORE, MAX_DEPTH};
use lucena_core::Position;
use lucena_search::{SearchMode, SearchResult, Searcher};

fn fresh_flag() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

fn search_depth(board: &Board, depth: u32) -> SearchResult {
    let mut searcher = Searcher::with_table_size(1);
    searcher.search(board, SearchMode::Depth(depth), fresh_flag(), |_| {})
}

#[test]
fn back_rank_mate_in_one() {
    let board: Board = "6k1/5ppp/8/8/8/8/5PPP/R5K1 w".parse().unwrap();
    let result = search_depth(&board, 2);
    assert_eq!(result.best_move.to_uci(), "a1a8");
    assert_eq!(result.score, MATE_SCORE - 1);
    assert!(result.is_mate);
}

#[test]
fn two_rook_ladder_mate_in_two() {
    // 1.Ra7 boxes the king on the back rank, 2.Rb8# ends it; mate in three
    // plies whatever Black tries
    let board: Board = "6k1/8/8/8/8/8/R7/1R4K1 w".parse().unwrap();
    let result = search_depth(&board, 5);
    assert!(result.is_mate, "ladder mate not found, score {}", result.score);
    assert!(
        result.score >= MATE_SCORE - 4,
        "expected mate within four plies, score {}",
        result.score
    );
}

#[test]
fn stalemate_scores_zero_at_depth_one() {
    let board: Board = "7k/5Q2/6K1/8/8/8/8/8 b".parse().unwrap();
    let result = search_depth(&board, 1);
    assert_eq!(result.score, 0);
    assert!(result.best_move.is_null());
}

#[test]
fn fifty_move_horizon_draws_the_search() {
    // White is a rook up, but with the halfmove clock at 99 every quiet
    // move lands on a dead draw; the search must report zero, not +500
    let board: Board = "4k3/8/8/8/8/8/8/R3K3 w - - 99 50".parse().unwrap();
    let result = search_depth(&board, 3);
    assert_eq!(result.score, 0, "search ignored the fifty-move rule");
}

#[test]
fn quiescence_resolves_the_pawn_grab() {
    // exd5 wins a pawn outright; standing pat on the intermediate material
    // swing would miss it
    let board: Board = "4k3/8/8/3p4/4P3/8/8/4K3 w".parse().unwrap();
    let result = search_depth(&board, 1);
    assert_eq!(result.best_move.to_uci(), "e4d5");
    assert!(result.score > 50, "pawn win not reflected: {}", result.score);
}

#[test]
fn every_capture_considered_at_depth_one() {
    // Three captures of different values are available; depth 1 must pick
    // the queen
    let board: Board = "6k1/8/8/1q1r1p2/2P1P3/8/8/6K1 w".parse().unwrap();
    let result = search_depth(&board, 1);
    assert_eq!(result.best_move.to_uci(), "c4b5");
}

#[test]
fn time_bounded_search_terminates_within_hard_cap() {
    let board = Board::starting_position();
    let mut searcher = Searcher::with_table_size(1);
    let start = Instant::now();
    let result = searcher.search(&board, SearchMode::Time(100), fresh_flag(), |_| {});
    let elapsed = start.elapsed().as_millis();

    assert!(!result.best_move.is_null());
    assert!(board.legal_moves().as_slice().contains(&result.best_move));
    // Hard cap is 4x the budget; allow slack for finishing the last node
    assert!(elapsed < 1000, "search ran {elapsed} ms on a 100 ms budget");
}

#[test]
fn fresh_table_reruns_are_identical() {
    let board: Board = "r1b2k1r/ppp1qppp/2n5/3p4/1b1P4/2N1PN2/PP3PPP/R1BQK2R w KQ"
        .parse()
        .unwrap();
    let first = search_depth(&board, 3);
    let second = search_depth(&board, 3);
    assert_eq!(first.best_move, second.best_move);
    assert_eq!(first.score, second.score);
    assert_eq!(first.nodes, second.nodes);
}

#[test]
fn cleared_table_matches_first_run() {
    let board: Board = "r1b2k1r/ppp1qppp/2n5/3p4/1b1P4/2N1PN2/PP3PPP/R1BQK2R w KQ"
        .parse()
        .unwrap();
    let mut searcher = Searcher::with_table_size(1);
    let first = searcher.search(&board, SearchMode::Depth(3), fresh_flag(), |_| {});
    searcher.clear_tt();
    let second = searcher.search(&board, SearchMode::Depth(3), fresh_flag(), |_| {});
    assert_eq!(first.best_move, second.best_move);
    assert_eq!(first.score, second.score);
}

#[test]
fn reported_pv_replays_as_legal_moves() {
    let board: Board = "r1b2k1r/ppp1qppp/2n5/3p4/1b1P4/2N1PN2/PP3PPP/R1BQK2R w KQ"
        .parse()
        .unwrap();
    let result = search_depth(&board, 3);
    assert!(!result.pv.is_empty());
    assert!(result.pv.len() <= MAX_DEPTH + 1);

    let mut replay = board;
    for &mv in &result.pv {
        assert!(
            replay.legal_moves().as_slice().contains(&mv),
            "PV move {mv} is not legal in its position"
        );
        assert!(replay.make_move(mv));
    }
}

#[test]
fn deeper_searches_still_return_legal_moves() {
    let board: Board = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -"
        .parse()
        .unwrap();
    let result = search_depth(&board, 3);
    assert!(board.legal_moves().as_slice().contains(&result.best_move));
}

#[test]
fn scores_stay_within_mate_bounds() {
    let positions = [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "6k1/5ppp/8/8/8/8/5PPP/R5K1 w",
        "4k3/8/8/3p4/4P3/8/8/4K3 w",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -",
    ];
    for fen in positions {
        let board: Board = fen.parse().unwrap();
        let result = search_depth(&board, 2);
        assert!(
            result.score.abs() <= MATE_SCORE,
            "score {} out of range for {fen}",
            result.score
        );
    }
}

#[test]
fn external_stop_is_honoured_quickly() {
    use std::sync::atomic::Ordering;

    let board = Board::starting_position();
    let mut searcher = Searcher::with_table_size(1);
    let flag = fresh_flag();
    let stop = Arc::clone(&flag);
    std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(20));
        stop.store(true, Ordering::Release);
    });

    let start = Instant::now();
    let result = searcher.search(&board, SearchMode::Depth(MAX_DEPTH as u32), flag, |_| {});
    assert!(start.elapsed().as_millis() < 5_000, "stop ignored");
    assert!(!result.best_move.is_null());
}
