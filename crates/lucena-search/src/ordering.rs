//! Move ordering: scoring and lazy best-first selection.
//!
//! Two scoring modes, chosen by the node:
//!
//! - Near the root (`depth >= 3`) and at PV nodes, captures are scored by
//!   static exchange evaluation, so losing captures sink below the quiet
//!   moves that killers and history push up.
//! - At shallow null-window nodes, captures use the cheaper MVV/LVA score
//!   and the killer/promotion constants are tuned into the same piece-index
//!   space.
//!
//! Both modes rely on the generator listing captures before quiet moves.

use lucena_core::values::{MATE_SCORE, MAX_POS_SCORE};
use lucena_core::{Move, MoveList, PieceKind, Position, ScoreList};

use crate::params::SearchParameters;

/// Shallow-mode killer score, tuned just above a minor piece capturing a
/// pawn in MVV/LVA space.
const SHALLOW_KILLER: i32 = PieceKind::Pawn as i32 - PieceKind::Knight as i32;

/// Shallow-mode queen promotion score: above every rook capture.
const SHALLOW_QUEEN_PROMOTION: i32 = 8 * PieceKind::Rook as i32;

/// Assign an ordering score to every move in `moves`.
///
/// `moves` must be partitioned captures-first. Quiet scores are offset by
/// `-MATE_SCORE` so that history values, which are non-negative, never lift
/// a quiet move above the killers.
pub(crate) fn score_moves<P: Position>(
    board: &P,
    moves: &MoveList,
    depth: i32,
    is_pv_node: bool,
    params: &SearchParameters,
) -> ScoreList {
    let color = board.side_to_move();
    let killers = params.killers.probe(params.ply);
    let mut scores = ScoreList::new();

    let mut index = 0;
    if depth >= 3 || is_pv_node {
        while index < moves.len() && moves[index].is_capture() {
            scores.push(board.see(color, moves[index].dest()));
            index += 1;
        }
        for i in index..moves.len() {
            let m = moves[i];
            let score = if m == killers[0] {
                0
            } else if m == killers[1] {
                -1
            } else if m.is_queen_promotion() {
                MAX_POS_SCORE
            } else {
                -MATE_SCORE + quiet_history(board, m, params)
            };
            scores.push(score);
        }
    } else {
        while index < moves.len() && moves[index].is_capture() {
            scores.push(board.mvv_lva_score(moves[index]));
            index += 1;
        }
        for i in index..moves.len() {
            let m = moves[i];
            let score = if m == killers[0] {
                SHALLOW_KILLER
            } else if m == killers[1] {
                SHALLOW_KILLER - 1
            } else if m.is_queen_promotion() {
                SHALLOW_QUEEN_PROMOTION
            } else {
                -MATE_SCORE + quiet_history(board, m, params)
            };
            scores.push(score);
        }
    }

    scores
}

fn quiet_history<P: Position>(board: &P, m: Move, params: &SearchParameters) -> i32 {
    let color = board.side_to_move();
    let piece = board.piece_on(color, m.source()).unwrap_or(PieceKind::Pawn);
    params.history.score(color, piece, m.dest().index())
}

/// Lazy best-next-move selection over a scored list.
///
/// Each call scans the remaining suffix for the maximum score and swaps it
/// to the front. Cutoffs usually fire after a handful of moves, so the
/// partial selection sort beats sorting the whole list up front.
pub(crate) struct MovePicker<'a> {
    moves: &'a mut MoveList,
    scores: &'a mut ScoreList,
    index: usize,
}

impl<'a> MovePicker<'a> {
    pub(crate) fn new(moves: &'a mut MoveList, scores: &'a mut ScoreList) -> MovePicker<'a> {
        debug_assert_eq!(moves.len(), scores.len());
        MovePicker {
            moves,
            scores,
            index: 0,
        }
    }

    /// The next highest-scored move, or `None` when exhausted.
    pub(crate) fn pick_next(&mut self) -> Option<Move> {
        if self.index >= self.moves.len() {
            return None;
        }

        let mut best_index = self.index;
        let mut best_score = self.scores.get(self.index);
        for i in (self.index + 1)..self.moves.len() {
            if self.scores.get(i) > best_score {
                best_index = i;
                best_score = self.scores.get(i);
            }
        }

        self.moves.swap(self.index, best_index);
        self.scores.swap(self.index, best_index);

        let mv = (*self.moves)[self.index];
        self.index += 1;
        Some(mv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucena_board::Board;
    use lucena_core::Square;

    fn pick_all(moves: &mut MoveList, scores: &mut ScoreList) -> Vec<Move> {
        let mut picker = MovePicker::new(moves, scores);
        let mut out = Vec::new();
        while let Some(mv) = picker.pick_next() {
            out.push(mv);
        }
        out
    }

    #[test]
    fn picker_yields_descending_scores() {
        let mut moves = MoveList::new();
        let mut scores = ScoreList::new();
        let squares = [Square::A1, Square::B1, Square::C1, Square::D1];
        for (i, &sq) in squares.iter().enumerate() {
            moves.push(Move::new_quiet(sq, Square::A8));
            scores.push([3, 9, -4, 7][i]);
        }
        let picked = pick_all(&mut moves, &mut scores);
        assert_eq!(picked[0].source(), Square::B1); // 9
        assert_eq!(picked[1].source(), Square::D1); // 7
        assert_eq!(picked[2].source(), Square::A1); // 3
        assert_eq!(picked[3].source(), Square::C1); // -4
    }

    #[test]
    fn picker_is_stable_for_ties() {
        let mut moves = MoveList::new();
        let mut scores = ScoreList::new();
        for sq in [Square::A1, Square::B1, Square::C1] {
            moves.push(Move::new_quiet(sq, Square::A8));
            scores.push(5);
        }
        let picked = pick_all(&mut moves, &mut scores);
        assert_eq!(picked[0].source(), Square::A1);
        assert_eq!(picked[1].source(), Square::B1);
        assert_eq!(picked[2].source(), Square::C1);
    }

    #[test]
    fn empty_list_yields_nothing() {
        let mut moves = MoveList::new();
        let mut scores = ScoreList::new();
        assert!(pick_all(&mut moves, &mut scores).is_empty());
    }

    #[test]
    fn winning_capture_ordered_before_quiets() {
        // White queen d4 can win the undefended pawn on e5
        let board: Board = "4k3/8/8/4p3/3Q4/8/8/4K3 w - - 0 1".parse().unwrap();
        let mut moves = board.pseudo_legal_moves();
        let params = SearchParameters::new();
        let mut scores = score_moves(&board, &moves, 5, false, &params);
        let mut picker = MovePicker::new(&mut moves, &mut scores);
        let first = picker.pick_next().unwrap();
        assert!(first.is_capture(), "first pick should be the capture");
    }

    #[test]
    fn killer_outranks_losing_capture() {
        // Qxc5 is the only capture and loses the queen to the d6 pawn; a
        // killer (score 0) must come first, the losing capture still beats
        // the remaining quiets.
        let board: Board = "6k1/8/3p4/2p5/8/4Q3/8/4K3 w - - 0 1".parse().unwrap();
        let mut moves = board.pseudo_legal_moves();
        let mut params = SearchParameters::new();
        let killer = moves
            .as_slice()
            .iter()
            .copied()
            .find(|m| !m.is_capture())
            .unwrap();
        params.killers.store(0, killer);
        let mut scores = score_moves(&board, &moves, 5, false, &params);
        let mut picker = MovePicker::new(&mut moves, &mut scores);
        assert_eq!(picker.pick_next(), Some(killer));
        let second = picker.pick_next().unwrap();
        assert!(second.is_capture(), "losing capture should follow the killer");
    }

    #[test]
    fn killer_ranked_above_plain_quiets() {
        let board = Board::starting_position();
        let mut moves = board.pseudo_legal_moves();
        let mut params = SearchParameters::new();
        let killer = moves[10];
        params.killers.store(0, killer);
        let mut scores = score_moves(&board, &moves, 5, false, &params);
        let mut picker = MovePicker::new(&mut moves, &mut scores);
        let first = picker.pick_next().unwrap();
        assert_eq!(first, killer);
    }

    #[test]
    fn history_breaks_quiet_ties() {
        let board = Board::starting_position();
        let mut moves = board.pseudo_legal_moves();
        let mut params = SearchParameters::new();
        let favored = moves[7];
        let color = board.side_to_move();
        let piece = board.piece_on(color, favored.source()).unwrap();
        params.history.credit(color, piece, favored.dest().index(), 10);
        let mut scores = score_moves(&board, &moves, 5, false, &params);
        let mut picker = MovePicker::new(&mut moves, &mut scores);
        let first = picker.pick_next().unwrap();
        assert_eq!(first, favored);
    }

    #[test]
    fn shallow_mode_uses_mvv_lva() {
        // Pawn takes queen must outrank pawn takes pawn
        let board: Board = "6k1/8/8/2q1p3/3P4/8/8/3QK3 w - - 0 1".parse().unwrap();
        let moves = board.pseudo_legal_moves();
        let params = SearchParameters::new();
        let scores = score_moves(&board, &moves, 1, false, &params);
        let mut best = i32::MIN;
        let mut best_move = Move::NULL;
        for i in 0..moves.len() {
            if scores.get(i) > best {
                best = scores.get(i);
                best_move = moves[i];
            }
        }
        assert_eq!(best_move.dest(), Square::from_algebraic("c5").unwrap());
        assert_eq!(
            board.piece_on(lucena_core::Color::White, best_move.source()),
            Some(PieceKind::Pawn)
        );
    }

    #[test]
    fn shallow_killer_above_pawn_capture_by_minor() {
        // The killer constant must beat a knight capturing a pawn (score -1
        // in MVV/LVA index space never exceeds it)
        assert!(SHALLOW_KILLER >= 8 * PieceKind::Pawn as i32 - PieceKind::Knight as i32);
        assert!(SHALLOW_QUEEN_PROMOTION > 8 * PieceKind::Rook as i32 - 1);
    }
}
