//! UCI command builders and engine output parsing.

/// A line of engine output, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EngineLine<'a> {
    UciOk,
    ReadyOk,
    /// `bestmove <move>`; `None` for `bestmove (none)`.
    BestMove(Option<&'a str>),
    /// `info ...`; `mate` carries the `score mate N` value if present.
    Info { mate: Option<i32> },
    Other,
}

pub(crate) fn parse_line(line: &str) -> EngineLine<'_> {
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some("uciok") => EngineLine::UciOk,
        Some("readyok") => EngineLine::ReadyOk,
        Some("bestmove") => match tokens.next() {
            Some("(none)" | "0000") | None => EngineLine::BestMove(None),
            Some(mv) => EngineLine::BestMove(Some(mv)),
        },
        Some("info") => EngineLine::Info {
            mate: parse_mate_score(line),
        },
        _ => EngineLine::Other,
    }
}

/// Extract `N` from `... score mate N ...`.
fn parse_mate_score(line: &str) -> Option<i32> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    tokens
        .windows(3)
        .find(|w| w[0] == "score" && w[1] == "mate")
        .and_then(|w| w[2].parse().ok())
}

pub(crate) fn setoption_command(name: &str, value: &str) -> String {
    format!("setoption name {name} value {value}")
}

pub(crate) fn position_command(fen: &str) -> String {
    format!("position fen {}", fen.trim())
}

pub(crate) fn go_depth_command(depth: u32) -> String {
    format!("go depth {depth}")
}

/// Raw command lines from an options file.
pub(crate) fn parse_options_file(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}
