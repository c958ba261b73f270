//! UCI command tokenization.

/// A parsed command line.
#[derive(Debug, Clone)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    Position(Vec<String>),
    Go(Vec<String>),
    SetOption(Vec<String>),
    Perft(usize),
    Stop,
    PonderHit,
    Quit,
    Unknown(String),
}

/// The `go` arguments after numeric parsing.
#[derive(Default, Debug, Clone)]
pub struct GoParams {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u64>,
    pub movetime: Option<u64>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub mate: Option<u32>,
    pub ponder: bool,
    pub infinite: bool,
}

#[inline]
fn parse_next<T: std::str::FromStr>(parts: &[&str], i: usize) -> Option<T> {
    parts.get(i + 1).and_then(|v| v.parse::<T>().ok())
}

#[must_use]
pub fn parse_go_params(parts: &[&str]) -> GoParams {
    let mut params = GoParams::default();
    let mut i = 1;
    while i < parts.len() {
        let consumed = match parts[i] {
            "wtime" => {
                params.wtime = parse_next(parts, i);
                2
            }
            "btime" => {
                params.btime = parse_next(parts, i);
                2
            }
            "winc" => {
                params.winc = parse_next(parts, i);
                2
            }
            "binc" => {
                params.binc = parse_next(parts, i);
                2
            }
            "movestogo" => {
                params.movestogo = parse_next(parts, i);
                2
            }
            "movetime" => {
                params.movetime = parse_next(parts, i);
                2
            }
            "depth" => {
                params.depth = parse_next(parts, i);
                2
            }
            "nodes" => {
                params.nodes = parse_next(parts, i);
                2
            }
            "mate" => {
                params.mate = parse_next(parts, i);
                2
            }
            "ponder" => {
                params.ponder = true;
                1
            }
            "infinite" => {
                params.infinite = true;
                1
            }
            _ => 1,
        };
        i += consumed;
    }
    params
}

#[must_use]
pub fn parse_uci_command(line: &str) -> Option<UciCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parts: Vec<&str> = trimmed.split_whitespace().collect();

    let owned = || parts.iter().map(|p| (*p).to_string()).collect::<Vec<_>>();

    let cmd = match parts[0] {
        "uci" => UciCommand::Uci,
        "isready" => UciCommand::IsReady,
        "ucinewgame" => UciCommand::UciNewGame,
        "position" => UciCommand::Position(owned()),
        "go" => UciCommand::Go(owned()),
        "setoption" => UciCommand::SetOption(owned()),
        "perft" => {
            let depth = parts.get(1).and_then(|v| v.parse().ok()).unwrap_or(1);
            UciCommand::Perft(depth)
        }
        "stop" => UciCommand::Stop,
        "ponderhit" => UciCommand::PonderHit,
        "quit" => UciCommand::Quit,
        _ => UciCommand::Unknown(trimmed.to_string()),
    };
    Some(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert!(matches!(parse_uci_command("uci"), Some(UciCommand::Uci)));
        assert!(matches!(
            parse_uci_command("isready"),
            Some(UciCommand::IsReady)
        ));
        assert!(matches!(
            parse_uci_command("ucinewgame"),
            Some(UciCommand::UciNewGame)
        ));
        assert!(matches!(parse_uci_command("stop"), Some(UciCommand::Stop)));
        assert!(matches!(
            parse_uci_command("ponderhit"),
            Some(UciCommand::PonderHit)
        ));
        assert!(matches!(parse_uci_command("quit"), Some(UciCommand::Quit)));
    }

    #[test]
    fn test_whitespace_and_empty() {
        assert!(parse_uci_command("").is_none());
        assert!(parse_uci_command("   \t ").is_none());
        assert!(matches!(parse_uci_command("  uci  "), Some(UciCommand::Uci)));
    }

    #[test]
    fn test_unknown_command() {
        match parse_uci_command("frobnicate") {
            Some(UciCommand::Unknown(s)) => assert_eq!(s, "frobnicate"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_position_tokens_preserved() {
        match parse_uci_command("position startpos moves e2e4 e7e5") {
            Some(UciCommand::Position(parts)) => {
                assert_eq!(parts[1], "startpos");
                assert_eq!(parts[3], "e2e4");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_perft_depth() {
        assert!(matches!(
            parse_uci_command("perft 5"),
            Some(UciCommand::Perft(5))
        ));
        assert!(matches!(
            parse_uci_command("perft"),
            Some(UciCommand::Perft(1))
        ));
    }

    #[test]
    fn test_go_params_clock() {
        let parts = vec![
            "go", "wtime", "300000", "btime", "290000", "winc", "2000", "binc", "2000",
            "movestogo", "40",
        ];
        let params = parse_go_params(&parts);
        assert_eq!(params.wtime, Some(300_000));
        assert_eq!(params.btime, Some(290_000));
        assert_eq!(params.winc, Some(2_000));
        assert_eq!(params.movestogo, Some(40));
        assert!(!params.infinite);
    }

    #[test]
    fn test_go_params_flags_and_limits() {
        let params = parse_go_params(&vec!["go", "depth", "12", "infinite", "ponder"]);
        assert_eq!(params.depth, Some(12));
        assert!(params.infinite);
        assert!(params.ponder);

        let params = parse_go_params(&vec!["go", "nodes", "500000", "movetime", "750"]);
        assert_eq!(params.nodes, Some(500_000));
        assert_eq!(params.movetime, Some(750));
    }

    #[test]
    fn test_go_params_bad_values_ignored() {
        let params = parse_go_params(&vec!["go", "depth", "abc", "movetime"]);
        assert!(params.depth.is_none());
        assert!(params.movetime.is_none());
    }
}
