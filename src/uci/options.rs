//! UCI option table and `setoption` handling.

use crate::engine::{EngineController, SearchType};

use super::print::Printer;

/// Mirror of the advertised option values, for printing defaults.
pub struct UciOptions {
    pub hash_mb: usize,
    pub threads: usize,
    pub multipv: u32,
    pub contempt: i32,
    pub ponder: bool,
    pub chess960: bool,
    pub syzygy_path: String,
    pub syzygy_probe_depth: u32,
    pub syzygy_probe_limit: u32,
    pub syzygy_50_move_rule: bool,
    pub search_type: SearchType,
    pub move_overhead_ms: u64,
}

impl Default for UciOptions {
    fn default() -> Self {
        UciOptions {
            hash_mb: 64,
            threads: 1,
            multipv: 1,
            contempt: 0,
            ponder: false,
            chess960: false,
            syzygy_path: String::new(),
            syzygy_probe_depth: 1,
            syzygy_probe_limit: 6,
            syzygy_50_move_rule: true,
            search_type: SearchType::AlphaBeta,
            move_overhead_ms: 30,
        }
    }
}

impl UciOptions {
    /// Print the `uci` identification block and option list.
    pub fn print(&self, printer: &Printer) {
        printer.line("id name Cinder 0.9");
        printer.line("id author the Cinder developers");
        printer.line(format!(
            "option name Hash type spin default {} min 16 max 1048576",
            self.hash_mb
        ));
        printer.line(format!(
            "option name Threads type spin default {} min 1 max 128",
            self.threads
        ));
        printer.line(format!(
            "option name MultiPV type spin default {} min 1 max 64",
            self.multipv
        ));
        printer.line(format!(
            "option name Contempt type spin default {} min -100 max 100",
            self.contempt
        ));
        printer.line(format!(
            "option name Ponder type check default {}",
            self.ponder
        ));
        printer.line(format!(
            "option name Chess960 type check default {}",
            self.chess960
        ));
        printer.line("option name ClearHash type button");
        printer.line("option name SyzygyPath type string default <empty>");
        printer.line(format!(
            "option name SyzygyProbeDepth type spin default {} min 1 max 100",
            self.syzygy_probe_depth
        ));
        printer.line(format!(
            "option name SyzygyProbeLimit type spin default {} min 0 max 7",
            self.syzygy_probe_limit
        ));
        printer.line(format!(
            "option name Syzygy50MoveRule type check default {}",
            self.syzygy_50_move_rule
        ));
        printer.line("option name SearchType type combo default alphabeta var alphabeta var random");
        printer.line(format!(
            "option name Move Overhead type spin default {} min 0 max 5000",
            self.move_overhead_ms
        ));
        printer.line("uciok");
    }

    /// Apply one `setoption`. Unknown names and bad values report an
    /// `info string` and leave everything unchanged.
    pub fn apply(
        &mut self,
        name: &str,
        value: Option<&str>,
        engine: &mut EngineController,
        printer: &Printer,
    ) {
        match name {
            "Hash" => {
                if let Some(mb) = value.and_then(|v| v.parse::<usize>().ok()) {
                    let mb = mb.clamp(16, 1_048_576);
                    if engine.resize_hash(mb) {
                        self.hash_mb = mb;
                    } else {
                        printer.line(format!(
                            "info string error: failed to allocate {mb} MB hash, keeping {} MB",
                            self.hash_mb
                        ));
                    }
                } else {
                    printer.line("info string error: Hash expects a size in MB");
                }
            }
            "Threads" => {
                if let Some(n) = value.and_then(|v| v.parse::<usize>().ok()) {
                    let n = n.clamp(1, 128);
                    engine.set_threads(n);
                    self.threads = n;
                } else {
                    printer.line("info string error: Threads expects a number");
                }
            }
            "MultiPV" => {
                if let Some(n) = value.and_then(|v| v.parse::<u32>().ok()) {
                    let n = n.clamp(1, 64);
                    engine.set_multipv(n);
                    self.multipv = n;
                }
            }
            "Contempt" => {
                if let Some(n) = value.and_then(|v| v.parse::<i32>().ok()) {
                    let n = n.clamp(-100, 100);
                    engine.set_contempt(n);
                    self.contempt = n;
                }
            }
            "Ponder" => {
                self.ponder = value == Some("true");
            }
            "Chess960" | "UCI_Chess960" => {
                self.chess960 = value == Some("true");
                engine.set_chess960(self.chess960);
            }
            "ClearHash" | "Clear Hash" => {
                engine.clear_hash();
            }
            "SyzygyPath" => {
                // Tablebases are an external collaborator; the path is
                // accepted so GUIs do not error, probing is not wired.
                self.syzygy_path = value.unwrap_or("").to_string();
                if !self.syzygy_path.is_empty() && self.syzygy_path != "<empty>" {
                    printer.line("info string tablebase probing not available in this build");
                }
            }
            "SyzygyProbeDepth" => {
                if let Some(n) = value.and_then(|v| v.parse::<u32>().ok()) {
                    self.syzygy_probe_depth = n.clamp(1, 100);
                }
            }
            "SyzygyProbeLimit" => {
                if let Some(n) = value.and_then(|v| v.parse::<u32>().ok()) {
                    self.syzygy_probe_limit = n.min(7);
                }
            }
            "Syzygy50MoveRule" => {
                self.syzygy_50_move_rule = value != Some("false");
            }
            "SearchType" => match value {
                Some("alphabeta") => {
                    self.search_type = SearchType::AlphaBeta;
                    engine.set_search_type(SearchType::AlphaBeta);
                }
                Some("random") => {
                    self.search_type = SearchType::Random;
                    engine.set_search_type(SearchType::Random);
                }
                _ => printer.line("info string error: SearchType is alphabeta or random"),
            },
            "Move Overhead" => {
                if let Some(ms) = value.and_then(|v| v.parse::<u64>().ok()) {
                    self.move_overhead_ms = ms.min(5000);
                    engine.set_move_overhead(self.move_overhead_ms);
                }
            }
            other => {
                printer.line(format!("info string error: unknown option '{other}'"));
            }
        }
    }
}

/// Split a `setoption` token list into (name, value).
#[must_use]
pub fn parse_setoption(parts: &[&str]) -> Option<(String, Option<String>)> {
    let name_idx = parts.iter().position(|p| *p == "name")?;
    let value_idx = parts.iter().position(|p| *p == "value");
    let name = match value_idx {
        Some(v_idx) if v_idx > name_idx + 1 => parts[name_idx + 1..v_idx].join(" "),
        None if name_idx + 1 < parts.len() => parts[name_idx + 1..].join(" "),
        _ => return None,
    };
    let value = value_idx.and_then(|v_idx| {
        if v_idx + 1 < parts.len() {
            Some(parts[v_idx + 1..].join(" "))
        } else {
            None
        }
    });
    Some((name, value))
}
