//! Event-driven UCI engine loop.
//!
//! The main thread owns the engine state and processes events from two
//! sources: a stdin reader thread and a search worker thread. Searching on
//! a worker keeps `stop` responsive mid-search.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use tracing::{debug, warn};

use lucena_board::Board;
use lucena_core::values::PAWN_VALUE_EG;
use lucena_search::{SearchResult, Searcher};

use crate::command::{parse_command, Command, GoParams};
use crate::error::UciError;

/// Internal engine state.
enum EngineState {
    Idle,
    Searching,
}

/// Events processed by the main engine loop.
enum EngineEvent {
    UciCommand(Result<Command, UciError>),
    SearchDone(SearchDone),
    InputClosed,
}

/// Payload returned by the search thread when it finishes.
struct SearchDone {
    result: SearchResult,
    searcher: Searcher,
}

/// The UCI engine, holding the current board and the searcher.
pub struct UciEngine {
    board: Board,
    searcher: Option<Searcher>,
    state: EngineState,
    stop_flag: Arc<AtomicBool>,
    pending_clear_tt: bool,
    pending_hash_mb: Option<usize>,
}

impl UciEngine {
    /// Create a new engine with the starting position.
    pub fn new() -> UciEngine {
        UciEngine {
            board: Board::starting_position(),
            searcher: Some(Searcher::new()),
            state: EngineState::Idle,
            stop_flag: Arc::new(AtomicBool::new(false)),
            pending_clear_tt: false,
            pending_hash_mb: None,
        }
    }

    /// Run the UCI event loop, reading from stdin until `quit` or EOF.
    pub fn run(mut self) -> Result<(), UciError> {
        let (tx, rx) = mpsc::channel::<EngineEvent>();

        // Stdin reader thread
        let stdin_tx = tx.clone();
        std::thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        debug!(cmd = %trimmed, "received UCI command");
                        let cmd = parse_command(trimmed);
                        if stdin_tx.send(EngineEvent::UciCommand(cmd)).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            let _ = stdin_tx.send(EngineEvent::InputClosed);
        });

        for event in &rx {
            match event {
                EngineEvent::UciCommand(Ok(cmd)) => match cmd {
                    Command::Uci => self.handle_uci(),
                    Command::IsReady => self.handle_isready(),
                    Command::UciNewGame => self.handle_ucinewgame(),
                    Command::Position(board) => self.handle_position(*board),
                    Command::Go(params) => self.handle_go(params, &tx),
                    Command::SetHashSize(mb) => self.handle_hash_size(mb),
                    Command::Stop => self.handle_stop(),
                    Command::Quit => {
                        // Stop any running search and collect the worker
                        if !matches!(self.state, EngineState::Idle) {
                            self.handle_stop();
                            for ev in &rx {
                                if let EngineEvent::SearchDone(done) = ev {
                                    self.finish_search(done);
                                    break;
                                }
                            }
                        }
                        break;
                    }
                    Command::Unknown(_) => {}
                },
                EngineEvent::UciCommand(Err(e)) => {
                    warn!(error = %e, "UCI parse error");
                }
                EngineEvent::SearchDone(done) => {
                    self.finish_search(done);
                }
                EngineEvent::InputClosed => break,
            }
        }

        debug!("lucena shutting down");
        Ok(())
    }

    fn handle_uci(&self) {
        println!("id name lucena");
        println!("id author the lucena developers");
        println!("option name Hash type spin default 16 min 1 max 1024");
        println!("uciok");
    }

    fn handle_isready(&self) {
        println!("readyok");
    }

    fn handle_ucinewgame(&mut self) {
        self.board = Board::starting_position();
        if let Some(ref mut searcher) = self.searcher {
            searcher.clear_tt();
        } else {
            // Search thread owns the searcher; clear once it comes back
            self.pending_clear_tt = true;
        }
    }

    fn handle_position(&mut self, board: Board) {
        self.board = board;
    }

    fn handle_hash_size(&mut self, mb: usize) {
        let mb = mb.clamp(1, 1024);
        if let Some(ref mut searcher) = self.searcher {
            searcher.resize_tt(mb);
        } else {
            self.pending_hash_mb = Some(mb);
        }
    }

    fn handle_go(&mut self, params: GoParams, tx: &mpsc::Sender<EngineEvent>) {
        if !matches!(self.state, EngineState::Idle) {
            warn!("go received while already searching, ignoring");
            return;
        }

        self.stop_flag = Arc::new(AtomicBool::new(false));
        let stopped = Arc::clone(&self.stop_flag);
        let mode = params.mode(&self.board);

        // The worker owns the searcher for the duration of the search
        let mut searcher = self.searcher.take().unwrap_or_default();
        let board = self.board;
        let tx = tx.clone();

        std::thread::spawn(move || {
            let result = searcher.search(&board, mode, stopped, |info| {
                let pv: Vec<String> = info.pv.iter().map(|m| m.to_uci()).collect();
                println!(
                    "info depth {} score cp {} time {} nodes {} nps {} pv {}",
                    info.depth,
                    info.score * 100 / PAWN_VALUE_EG,
                    info.time_ms,
                    info.nodes,
                    info.nps,
                    pv.join(" ")
                );
            });
            let _ = tx.send(EngineEvent::SearchDone(SearchDone { result, searcher }));
        });

        self.state = EngineState::Searching;
    }

    fn handle_stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
    }

    fn finish_search(&mut self, done: SearchDone) {
        let mut searcher = done.searcher;

        if self.pending_clear_tt {
            searcher.clear_tt();
            self.pending_clear_tt = false;
        }
        if let Some(mb) = self.pending_hash_mb.take() {
            searcher.resize_tt(mb);
        }
        self.searcher = Some(searcher);

        if done.result.best_move.is_null() {
            println!("bestmove 0000");
        } else {
            println!("bestmove {}", done.result.best_move.to_uci());
        }

        self.state = EngineState::Idle;
    }
}

impl Default for UciEngine {
    fn default() -> Self {
        Self::new()
    }
}
