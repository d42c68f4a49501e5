//! UCI command parsing.

use lucena_board::Board;
use lucena_core::values::MAX_DEPTH;
use lucena_core::{Color, Position};
use lucena_search::{allot_time, SearchMode};

use crate::error::UciError;

/// Parameters for the `go` command.
///
/// All fields are optional; a bare `go` searches to the maximum depth.
#[derive(Debug, Clone, Default)]
pub struct GoParams {
    /// White's remaining time in milliseconds.
    pub wtime: Option<u64>,
    /// Black's remaining time in milliseconds.
    pub btime: Option<u64>,
    /// White's increment per move in milliseconds.
    pub winc: Option<u64>,
    /// Black's increment per move in milliseconds.
    pub binc: Option<u64>,
    /// Search to this depth only.
    pub depth: Option<u32>,
    /// Search for exactly this many milliseconds.
    pub movetime: Option<u64>,
    /// Search until `stop`.
    pub infinite: bool,
}

impl GoParams {
    /// Resolve the parameters into a search mode for the side to move.
    ///
    /// `movetime` and the clock both map to TIME mode; the clock allots
    /// `remaining / MOVE_HORIZON + increment`. `depth` and `infinite` map
    /// to DEPTH mode, the latter effectively unbounded.
    pub fn mode(&self, board: &Board) -> SearchMode {
        if let Some(ms) = self.movetime {
            return SearchMode::Time(ms);
        }
        if self.infinite {
            return SearchMode::Depth(MAX_DEPTH as u32);
        }
        if let Some(depth) = self.depth {
            return SearchMode::Depth(depth);
        }

        let (remaining, increment) = match board.side_to_move() {
            Color::White => (self.wtime, self.winc),
            Color::Black => (self.btime, self.binc),
        };
        match remaining {
            Some(ms) => SearchMode::Time(allot_time(ms, increment.unwrap_or(0))),
            None => SearchMode::Depth(MAX_DEPTH as u32),
        }
    }
}

/// A parsed UCI command.
#[derive(Debug)]
pub enum Command {
    /// `uci` -- identify the engine.
    Uci,
    /// `isready` -- synchronization ping.
    IsReady,
    /// `ucinewgame` -- reset engine state.
    UciNewGame,
    /// `position` -- set up a board with optional moves applied.
    Position(Box<Board>),
    /// `go` -- start searching.
    Go(GoParams),
    /// `setoption name Hash value <mb>` -- resize the transposition table.
    SetHashSize(usize),
    /// `stop` -- halt the current search.
    Stop,
    /// `quit` -- exit the engine.
    Quit,
    /// Unrecognized command (silently ignored per UCI convention).
    Unknown(String),
}

/// Parse a single line of UCI input into a [`Command`].
pub fn parse_command(line: &str) -> Result<Command, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(Command::Unknown(String::new()));
    }

    match tokens[0] {
        "uci" => Ok(Command::Uci),
        "isready" => Ok(Command::IsReady),
        "ucinewgame" => Ok(Command::UciNewGame),
        "stop" => Ok(Command::Stop),
        "quit" => Ok(Command::Quit),
        "position" => parse_position(&tokens[1..]),
        "go" => parse_go(&tokens[1..]),
        "setoption" => parse_setoption(&tokens[1..]),
        _ => Ok(Command::Unknown(tokens[0].to_string())),
    }
}

/// Parse the `position` command arguments.
///
/// Supports `position startpos [moves ...]` and
/// `position fen <fen> [moves ...]`.
fn parse_position(tokens: &[&str]) -> Result<Command, UciError> {
    if tokens.is_empty() {
        return Err(UciError::MalformedPosition);
    }

    let (mut board, rest) = if tokens[0] == "startpos" {
        (Board::starting_position(), &tokens[1..])
    } else if tokens[0] == "fen" {
        // FEN is up to 6 space-separated fields, ending at "moves" if present
        let fen_end = tokens
            .iter()
            .position(|&t| t == "moves")
            .unwrap_or(tokens.len());
        let fen = tokens[1..fen_end].join(" ");
        let board: Board = fen.parse().map_err(|_| UciError::InvalidFen { fen })?;
        (board, &tokens[fen_end..])
    } else {
        return Err(UciError::MalformedPosition);
    };

    if let Some((&keyword, moves)) = rest.split_first() {
        if keyword == "moves" {
            for &uci_move in moves {
                let mv = board.parse_uci_move(uci_move).ok_or_else(|| {
                    UciError::InvalidMove {
                        uci_move: uci_move.to_string(),
                    }
                })?;
                if !board.make_move(mv) {
                    return Err(UciError::InvalidMove {
                        uci_move: uci_move.to_string(),
                    });
                }
            }
        }
    }

    Ok(Command::Position(Box::new(board)))
}

/// Parse the `go` command arguments.
fn parse_go(tokens: &[&str]) -> Result<Command, UciError> {
    let mut params = GoParams::default();
    let mut iter = tokens.iter();

    while let Some(&token) = iter.next() {
        match token {
            "infinite" => params.infinite = true,
            "wtime" => params.wtime = Some(parse_value(token, iter.next())?),
            "btime" => params.btime = Some(parse_value(token, iter.next())?),
            "winc" => params.winc = Some(parse_value(token, iter.next())?),
            "binc" => params.binc = Some(parse_value(token, iter.next())?),
            "movetime" => params.movetime = Some(parse_value(token, iter.next())?),
            "depth" => params.depth = Some(parse_value(token, iter.next())?),
            // movestogo, nodes, mate, ponder: accepted and ignored
            "movestogo" | "nodes" | "mate" => {
                let _ = iter.next();
            }
            _ => {}
        }
    }

    Ok(Command::Go(params))
}

/// Parse `setoption name Hash value <mb>`.
fn parse_setoption(tokens: &[&str]) -> Result<Command, UciError> {
    let name_pos = tokens.iter().position(|&t| t == "name");
    let value_pos = tokens.iter().position(|&t| t == "value");
    let (Some(name_pos), Some(value_pos)) = (name_pos, value_pos) else {
        return Ok(Command::Unknown("setoption".to_string()));
    };
    if name_pos + 1 > value_pos {
        return Ok(Command::Unknown("setoption".to_string()));
    }

    let name = tokens[name_pos + 1..value_pos].join(" ");
    if !name.eq_ignore_ascii_case("hash") {
        return Ok(Command::Unknown(format!("setoption {name}")));
    }

    let value = tokens.get(value_pos + 1).ok_or_else(|| UciError::MissingValue {
        param: "Hash".to_string(),
    })?;
    let mb: usize = value.parse().map_err(|_| UciError::InvalidValue {
        param: "Hash".to_string(),
        value: value.to_string(),
    })?;
    Ok(Command::SetHashSize(mb))
}

fn parse_value<T: std::str::FromStr>(param: &str, value: Option<&&str>) -> Result<T, UciError> {
    let value = value.ok_or_else(|| UciError::MissingValue {
        param: param.to_string(),
    })?;
    value.parse().map_err(|_| UciError::InvalidValue {
        param: param.to_string(),
        value: value.to_string(),
    })
}
