//! Principal-variation search core.
//!
//! The [`Searcher`] owns the persistent transposition table and drives
//! iterative deepening over any [`Position`] implementation: root PVS with a
//! null-window re-search, quiescence with a one-ply check extension, null
//! move and futility pruning, late move reductions, killers, history, and
//! internal iterative deepening.

mod control;
mod ordering;
mod params;
mod pv;
mod pvs;
mod quiescence;
mod tt;

pub use control::{allot_time, SearchControl, SearchMode, MAX_TIME_FACTOR, ONE_SECOND, TIME_FACTOR};
pub use params::{HistoryTable, KillerTable, SearchParameters, SearchStatistics};
pub use tt::{HashEntry, NodeType, TranspositionTable};

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use lucena_core::values::{MATE_SCORE, MAX_DEPTH};
use lucena_core::{Move, MoveList, Position};

use pv::SearchPv;
use pvs::{pvs, SearchContext};

/// Default transposition table size in megabytes.
const DEFAULT_TT_MB: usize = 16;

/// Per-iteration report passed to the driver's callback.
#[derive(Debug)]
pub struct SearchInfo<'a> {
    /// Completed iteration depth.
    pub depth: u32,
    /// Internal score from the side to move's perspective.
    pub score: i32,
    /// Elapsed time since the search started.
    pub time_ms: u64,
    /// Nodes visited so far.
    pub nodes: u64,
    /// Nodes per second.
    pub nps: u64,
    /// Principal variation of the completed iteration.
    pub pv: &'a [Move],
}

/// Result of a completed search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Best move of the deepest completed iteration. Null only when the
    /// position had no legal move at all.
    pub best_move: Move,
    /// Internal score of the best move.
    pub score: i32,
    /// Deepest completed iteration.
    pub depth: u32,
    /// Total nodes visited.
    pub nodes: u64,
    /// Whether the score denotes a forced mate.
    pub is_mate: bool,
    /// Principal variation.
    pub pv: Vec<Move>,
}

/// Iterative-deepening searcher with a persistent transposition table.
pub struct Searcher {
    tt: TranspositionTable,
    params: SearchParameters,
    stats: SearchStatistics,
}

impl Searcher {
    /// Create a searcher with the default 16 MB table.
    pub fn new() -> Searcher {
        Searcher::with_table_size(DEFAULT_TT_MB)
    }

    /// Create a searcher with a table of roughly `mb` megabytes.
    pub fn with_table_size(mb: usize) -> Searcher {
        Searcher {
            tt: TranspositionTable::new(mb),
            params: SearchParameters::new(),
            stats: SearchStatistics::new(),
        }
    }

    /// Clear the transposition table, keeping the allocation.
    pub fn clear_tt(&mut self) {
        self.tt.clear();
    }

    /// Replace the transposition table with one of `mb` megabytes.
    pub fn resize_tt(&mut self, mb: usize) {
        self.tt = TranspositionTable::new(mb);
    }

    /// Run an iterative-deepening search.
    ///
    /// `stopped` is the cooperative stop flag: setting it from another
    /// thread aborts the search at the next move boundary, and the driver
    /// sets it itself once finished. `on_iter` fires after every completed
    /// iteration, in depth order, for `info` output.
    ///
    /// The position's first legal move is preloaded as the answer, so even
    /// an immediately-stopped search reports something playable.
    pub fn search<P, F>(
        &mut self,
        board: &P,
        mode: SearchMode,
        stopped: Arc<AtomicBool>,
        mut on_iter: F,
    ) -> SearchResult
    where
        P: Position,
        F: FnMut(&SearchInfo),
    {
        self.params.reset();
        self.stats.reset();
        self.params.root_move_number = board.move_number() as u8;
        let control = SearchControl::new(mode, stopped);

        let mut legal = board.legal_moves();
        if legal.is_empty() {
            let score = if board.in_check(board.side_to_move()) {
                -MATE_SCORE
            } else {
                0
            };
            control.signal_stop();
            return SearchResult {
                best_move: Move::NULL,
                score,
                depth: 0,
                nodes: 0,
                is_mate: false,
                pv: Vec::new(),
            };
        }

        let mut best_move = legal[0];
        let mut best_score = 0;
        let mut is_mate = false;
        let mut completed_depth = 0u32;
        let mut final_pv: Vec<Move> = vec![best_move];

        let mut root_depth: u32 = 1;
        loop {
            let mut pv_line = SearchPv::new();
            let mut ctx = SearchContext {
                tt: &mut self.tt,
                params: &mut self.params,
                stats: &mut self.stats,
                control: &control,
            };
            let (index, score, mate) =
                root_search(&mut ctx, board, &legal, root_depth as i32, &mut pv_line);

            // A stop before any root move completed leaves the previous
            // iteration's answer in place
            let Some(best_index) = index else {
                break;
            };

            // Try the winner first on the next iteration
            legal.swap(0, best_index);
            best_move = legal[0];
            best_score = score;
            is_mate = mate;
            completed_depth = root_depth;
            final_pv = pv_line.line().to_vec();

            let time_ms = control.elapsed_ms();
            let nps = self.stats.nodes * ONE_SECOND / time_ms.max(1);
            on_iter(&SearchInfo {
                depth: root_depth,
                score,
                time_ms,
                nodes: self.stats.nodes,
                nps,
                pv: pv_line.line(),
            });

            if is_mate {
                break;
            }
            root_depth += 1;
            let keep_going = match mode {
                SearchMode::Time(budget_ms) => {
                    control.elapsed_ms() < (budget_ms as f64 * TIME_FACTOR) as u64
                        && root_depth <= MAX_DEPTH as u32
                }
                SearchMode::Depth(target) => {
                    root_depth <= target && root_depth <= MAX_DEPTH as u32
                }
            };
            if !keep_going {
                break;
            }
        }

        self.stats.log_summary(self.tt.used(), self.tt.capacity());
        // Aging: history carries too much momentum to survive into an
        // unrelated search
        self.params.history.reset();
        control.signal_stop();

        if final_pv.is_empty() {
            final_pv = vec![best_move];
        }
        SearchResult {
            best_move,
            score: best_score,
            depth: completed_depth,
            nodes: self.stats.nodes,
            is_mate,
            pv: final_pv,
        }
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher").field("tt", &self.tt).finish()
    }
}

/// PVS over the root move list. Returns the index of the best move (`None`
/// if a stop fired before any move finished), the score, and the mate flag.
fn root_search<P: Position>(
    ctx: &mut SearchContext,
    board: &P,
    legal: &MoveList,
    depth: i32,
    pv_line: &mut SearchPv,
) -> (Option<usize>, i32, bool) {
    let color = board.side_to_move();
    let mut line = SearchPv::new();
    let mut best_index = None;
    let mut alpha = -MATE_SCORE;
    let beta = MATE_SCORE;

    for i in 0..legal.len() {
        ctx.control.check_hard_limit();
        if ctx.control.is_stopped() {
            return (best_index, alpha, false);
        }

        let mut copy = board.clone();
        let applied = copy.make_move(legal[i]);
        debug_assert!(applied, "root moves are legal by construction");
        ctx.stats.nodes += 1;

        let mut score;
        if i != 0 {
            ctx.params.ply += 1;
            score = -pvs(ctx, &copy, !color, depth - 1, -alpha - 1, -alpha, &mut line);
            ctx.params.ply -= 1;
            if alpha < score && score < beta {
                ctx.params.ply += 1;
                score = -pvs(ctx, &copy, !color, depth - 1, -beta, -alpha, &mut line);
                ctx.params.ply -= 1;
            }
        } else {
            ctx.params.ply += 1;
            score = -pvs(ctx, &copy, !color, depth - 1, -beta, -alpha, &mut line);
            ctx.params.ply -= 1;
        }

        // A score produced after the stop request is garbage; drop it
        if ctx.control.is_stopped() {
            return (best_index, alpha, false);
        }

        if score > alpha {
            alpha = score;
            best_index = Some(i);
            pv_line.splice(legal[i], &line);
        }
    }

    let is_mate = alpha >= MATE_SCORE - MAX_DEPTH as i32;
    (best_index, alpha, is_mate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    use lucena_board::Board;

    fn fresh_flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    fn search_depth(searcher: &mut Searcher, board: &Board, depth: u32) -> SearchResult {
        searcher.search(board, SearchMode::Depth(depth), fresh_flag(), |_| {})
    }

    #[test]
    fn depth_1_returns_legal_move() {
        let board = Board::starting_position();
        let mut searcher = Searcher::with_table_size(1);
        let result = search_depth(&mut searcher, &board, 1);
        assert!(!result.best_move.is_null());
        assert!(board
            .legal_moves()
            .as_slice()
            .contains(&result.best_move));
    }

    #[test]
    fn finds_back_rank_mate_in_one() {
        let board: Board = "6k1/5ppp/8/8/8/8/5PPP/R5K1 w".parse().unwrap();
        let mut searcher = Searcher::with_table_size(1);
        let result = search_depth(&mut searcher, &board, 2);
        assert_eq!(result.best_move.to_uci(), "a1a8");
        assert_eq!(result.score, MATE_SCORE - 1);
        assert!(result.is_mate);
    }

    #[test]
    fn finds_mate_in_one_as_black() {
        let board: Board = "r5k1/5ppp/8/8/8/8/5PPP/6K1 b".parse().unwrap();
        let mut searcher = Searcher::with_table_size(1);
        let result = search_depth(&mut searcher, &board, 2);
        assert_eq!(result.best_move.to_uci(), "a8a1");
        assert_eq!(result.score, MATE_SCORE - 1);
        assert!(result.is_mate);
    }

    #[test]
    fn no_legal_moves_stalemate() {
        let board: Board = "7k/5Q2/6K1/8/8/8/8/8 b".parse().unwrap();
        let mut searcher = Searcher::with_table_size(1);
        let result = search_depth(&mut searcher, &board, 1);
        assert!(result.best_move.is_null());
        assert_eq!(result.score, 0);
    }

    #[test]
    fn no_legal_moves_checkmate() {
        let board: Board = "R5k1/5ppp/8/8/8/8/5PPP/6K1 b".parse().unwrap();
        let mut searcher = Searcher::with_table_size(1);
        let result = search_depth(&mut searcher, &board, 1);
        assert!(result.best_move.is_null());
        assert_eq!(result.score, -MATE_SCORE);
    }

    #[test]
    fn iteration_callback_fires_in_depth_order() {
        let board = Board::starting_position();
        let mut searcher = Searcher::with_table_size(1);
        let mut depths = Vec::new();
        searcher.search(&board, SearchMode::Depth(3), fresh_flag(), |info| {
            depths.push(info.depth);
        });
        assert_eq!(depths, vec![1, 2, 3]);
    }

    #[test]
    fn pv_first_move_matches_best_move() {
        let board = Board::starting_position();
        let mut searcher = Searcher::with_table_size(1);
        let result = search_depth(&mut searcher, &board, 3);
        assert!(!result.pv.is_empty());
        assert_eq!(result.pv[0], result.best_move);
    }

    #[test]
    fn stop_flag_pre_set_keeps_preloaded_move() {
        let board = Board::starting_position();
        let mut searcher = Searcher::with_table_size(1);
        let flag = Arc::new(AtomicBool::new(true));
        let result = searcher.search(&board, SearchMode::Depth(50), flag, |_| {});
        // No iteration completed, but the preloaded first legal move stands
        assert!(!result.best_move.is_null());
        assert_eq!(result.depth, 0);
    }

    #[test]
    fn root_move_order_does_not_change_score() {
        // King-and-pawn position: small enough that every permutation
        // searches the same tree modulo ordering
        let board: Board = "4k3/8/8/3p4/4P3/8/8/4K3 w".parse().unwrap();
        let depth = 3;

        let run = |rotate: usize| {
            let mut tt = TranspositionTable::new(1);
            let mut params = SearchParameters::new();
            let mut stats = SearchStatistics::new();
            let control = SearchControl::new(SearchMode::Depth(depth as u32), fresh_flag());
            let mut ctx = SearchContext {
                tt: &mut tt,
                params: &mut params,
                stats: &mut stats,
                control: &control,
            };
            let mut legal = board.legal_moves();
            for _ in 0..rotate {
                let first = legal[0];
                legal.remove(0);
                legal.push(first);
            }
            let mut pv_line = SearchPv::new();
            let (index, score, _) = root_search(&mut ctx, &board, &legal, depth, &mut pv_line);
            (legal[index.unwrap()], score)
        };

        let (move_a, score_a) = run(0);
        let (move_b, score_b) = run(3);
        assert_eq!(score_a, score_b, "root permutation changed the score");
        assert_eq!(move_a, move_b, "root permutation changed the move");
    }

    #[test]
    fn repeated_search_is_deterministic() {
        let board: Board = "r1b2k1r/ppp1qppp/2n5/3p4/1b1P4/2N1PN2/PP3PPP/R1BQK2R w KQ"
            .parse()
            .unwrap();
        let mut first = Searcher::with_table_size(1);
        let mut second = Searcher::with_table_size(1);
        let a = search_depth(&mut first, &board, 3);
        let b = search_depth(&mut second, &board, 3);
        assert_eq!(a.best_move, b.best_move);
        assert_eq!(a.score, b.score);
    }

    #[test]
    fn ply_restored_after_search() {
        let board = Board::starting_position();
        let mut searcher = Searcher::with_table_size(1);
        let _ = search_depth(&mut searcher, &board, 3);
        assert_eq!(searcher.params.ply, 0);
        assert_eq!(searcher.params.null_move_count, 0);
    }
}
