//! UCI protocol front end.
//!
//! Line-oriented command loop over stdin/stdout. Malformed input never
//! escapes this layer: it is reported as `info string error: …` and the
//! command is dropped, so the protocol stays responsive.

pub mod command;
pub mod options;
pub mod print;

use std::fmt;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use crate::board::{Board, FenError, MoveParseError};
use crate::engine::{EngineController, GoRequest, TimeControl};
use crate::search::SearchInfo;

use command::{parse_go_params, parse_uci_command, GoParams, UciCommand};
use options::{parse_setoption, UciOptions};
use print::Printer;

/// Error from a `position` command.
#[derive(Debug, Clone)]
pub enum UciError {
    InvalidFen(FenError),
    InvalidMove {
        move_str: String,
        error: MoveParseError,
    },
    MissingParts,
}

impl fmt::Display for UciError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UciError::InvalidFen(e) => write!(f, "invalid FEN: {e}"),
            UciError::InvalidMove { move_str, error } => {
                write!(f, "invalid move '{move_str}': {error}")
            }
            UciError::MissingParts => write!(f, "malformed position command"),
        }
    }
}

impl std::error::Error for UciError {}

impl From<FenError> for UciError {
    fn from(e: FenError) -> Self {
        UciError::InvalidFen(e)
    }
}

/// Parse `position [startpos|fen …] [moves …]` into a board.
pub fn parse_position_command(parts: &[&str], chess960: bool) -> Result<Board, UciError> {
    let mut i = 1;
    if i >= parts.len() {
        return Err(UciError::MissingParts);
    }

    let mut board = if parts[i] == "startpos" {
        i += 1;
        Board::new()
    } else if parts[i] == "fen" {
        // FEN is six fields, but tolerate four (clocks defaulted).
        let start = i + 1;
        let end = parts
            .iter()
            .position(|p| *p == "moves")
            .unwrap_or(parts.len());
        if end <= start {
            return Err(UciError::MissingParts);
        }
        let fen = parts[start..end].join(" ");
        i = end;
        Board::try_from_fen(&fen)?
    } else {
        return Err(UciError::MissingParts);
    };
    board.set_chess960(chess960);

    if i < parts.len() && parts[i] == "moves" {
        for token in &parts[i + 1..] {
            let mv = board
                .parse_move(token)
                .map_err(|error| UciError::InvalidMove {
                    move_str: (*token).to_string(),
                    error,
                })?;
            board.make_move(mv);
        }
    }
    Ok(board)
}

fn format_info_line(info: &SearchInfo) -> String {
    let score = match info.mate {
        Some(mate) => format!("mate {mate}"),
        None => format!("cp {}", info.score),
    };
    let mut line = format!(
        "info depth {} seldepth {} multipv {} score {} nodes {} nps {} hashfull {} time {}",
        info.depth,
        info.seldepth,
        info.multipv,
        score,
        info.nodes,
        info.nps,
        info.hashfull,
        info.time_ms
    );
    if !info.pv.is_empty() {
        line.push_str(" pv ");
        line.push_str(&info.pv);
    }
    line
}

fn build_go_request(params: &GoParams, board: &Board) -> GoRequest {
    let our_time = if board.side_to_move() == crate::board::Color::White {
        (params.wtime, params.winc)
    } else {
        (params.btime, params.binc)
    };

    let time_control = if let Some(movetime) = params.movetime {
        TimeControl::MoveTime { time_ms: movetime }
    } else if let Some(remaining) = our_time.0 {
        TimeControl::incremental(
            Duration::from_millis(remaining),
            Duration::from_millis(our_time.1.unwrap_or(0)),
            params.movestogo,
        )
    } else {
        TimeControl::Unlimited
    };

    GoRequest {
        depth: params.depth,
        nodes: params.nodes,
        time_control,
        infinite: params.infinite,
        ponder: params.ponder,
    }
}

/// Run the UCI loop until `quit`. Returns the process exit code.
pub fn run() -> i32 {
    let mut engine = EngineController::new(64, 1);
    let mut uci_options = UciOptions::default();
    let printer = Printer::default();

    // Search info lines flow from worker 0 through this callback.
    {
        let printer = printer.clone();
        engine.set_info_callback(Some(Arc::new(move |info: &SearchInfo| {
            printer.line(format_info_line(info));
        })));
    }

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        #[cfg(feature = "logging")]
        log::debug!("uci< {line}");
        let Some(cmd) = parse_uci_command(&line) else {
            continue;
        };

        match cmd {
            UciCommand::Uci => uci_options.print(&printer),
            UciCommand::IsReady => printer.line("readyok"),
            UciCommand::UciNewGame => engine.new_game(),
            UciCommand::Position(parts) => {
                let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
                match parse_position_command(&refs, engine.is_chess960()) {
                    Ok(board) => engine.set_board(board),
                    Err(e) => printer.line(format!("info string error: {e}")),
                }
            }
            UciCommand::SetOption(parts) => {
                let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
                match parse_setoption(&refs) {
                    Some((name, value)) => {
                        uci_options.apply(&name, value.as_deref(), &mut engine, &printer);
                    }
                    None => printer.line("info string error: malformed setoption"),
                }
            }
            UciCommand::Go(parts) => {
                let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
                let params = parse_go_params(&refs);
                let request = build_go_request(&params, engine.board());
                let report_board = engine.board().clone();
                let printer = printer.clone();
                engine.start_search(request, move |best, ponder| match best {
                    Some(mv) => {
                        let best_str = report_board.format_move(mv);
                        match ponder {
                            Some(p) => printer.line(format!(
                                "bestmove {best_str} ponder {}",
                                report_board_after(&report_board, mv, p)
                            )),
                            None => printer.line(format!("bestmove {best_str}")),
                        }
                    }
                    None => printer.line("bestmove 0000"),
                });
            }
            UciCommand::Perft(depth) => {
                let mut board = engine.board().clone();
                let start = std::time::Instant::now();
                let nodes = board.perft(depth.min(7));
                printer.line(format!(
                    "info string perft {} nodes {} time {} ms",
                    depth.min(7),
                    nodes,
                    start.elapsed().as_millis()
                ));
            }
            UciCommand::Stop => engine.signal_stop(),
            UciCommand::PonderHit => engine.ponderhit(),
            UciCommand::Quit => {
                engine.stop_search();
                return 0;
            }
            UciCommand::Unknown(text) => {
                printer.line(format!("info string error: unknown command '{text}'"));
            }
        }
    }

    engine.stop_search();
    0
}

/// Format the ponder move in the position after `best` was played.
fn report_board_after(board: &Board, best: crate::board::Move, ponder: crate::board::Move) -> String {
    let mut after = board.clone();
    after.make_move(best);
    after.format_move(ponder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_position_startpos_with_moves() {
        let parts = vec!["position", "startpos", "moves", "e2e4", "e7e5"];
        let board = parse_position_command(&parts, false).unwrap();
        assert_eq!(board.game_ply(), 2);
    }

    #[test]
    fn test_parse_position_fen() {
        let parts = vec![
            "position", "fen", "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8", "w", "-", "-", "0", "1",
        ];
        let board = parse_position_command(&parts, false).unwrap();
        assert_eq!(board.occupied().popcount(), 10);
    }

    #[test]
    fn test_parse_position_fen_then_moves() {
        let parts = vec![
            "position", "fen", "4k3/8/8/8/8/8/4P3/4K3", "w", "-", "-", "0", "1", "moves", "e2e4",
        ];
        let board = parse_position_command(&parts, false).unwrap();
        assert!(board.piece_at(crate::board::Square::new(3, 4)).is_some());
    }

    #[test]
    fn test_parse_position_rejects_bad_input() {
        assert!(parse_position_command(&["position"], false).is_err());
        assert!(parse_position_command(&["position", "junk"], false).is_err());
        assert!(
            parse_position_command(&["position", "startpos", "moves", "e2e5"], false).is_err()
        );
        assert!(parse_position_command(&["position", "fen", "garbage"], false).is_err());
    }

    #[test]
    fn test_format_info_line_cp_and_mate() {
        let mut info = SearchInfo {
            depth: 8,
            seldepth: 14,
            multipv: 1,
            score: 35,
            mate: None,
            nodes: 12345,
            nps: 100000,
            time_ms: 123,
            hashfull: 42,
            pv: "e2e4 e7e5".to_string(),
        };
        let line = format_info_line(&info);
        assert!(line.starts_with("info depth 8"));
        assert!(line.contains("score cp 35"));
        assert!(line.contains("pv e2e4 e7e5"));

        info.mate = Some(3);
        let line = format_info_line(&info);
        assert!(line.contains("score mate 3"));
    }

    #[test]
    fn test_build_go_request_sides() {
        let board = Board::new();
        let params = GoParams {
            wtime: Some(60_000),
            btime: Some(1_000),
            winc: Some(500),
            ..Default::default()
        };
        let request = build_go_request(&params, &board);
        match request.time_control {
            TimeControl::Incremental {
                time_left_ms,
                inc_ms,
                ..
            } => {
                assert_eq!(time_left_ms, 60_000);
                assert_eq!(inc_ms, 500);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_build_go_request_movetime_priority() {
        let board = Board::new();
        let params = GoParams {
            movetime: Some(750),
            wtime: Some(60_000),
            ..Default::default()
        };
        let request = build_go_request(&params, &board);
        assert_eq!(
            request.time_control,
            TimeControl::MoveTime { time_ms: 750 }
        );
    }
}
