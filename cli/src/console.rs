//! Line-oriented console commands.

use chesspilot_types::{CastlingRights, Color, ExecutionStyle};

pub const HELP: &str = "\
Commands:
  play              find and play the best move now
  auto on|off       start or stop automatic play
  side white|black  play as the given color
  side clear        forget the side (re-detected when allowed)
  style drag|click  how moves are entered
  castle KQkq|-     castling rights still available
  help              show this text
  quit              exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play,
    Auto(bool),
    Side(Option<Color>),
    Style(ExecutionStyle),
    Castle(CastlingRights),
    Help,
    Quit,
}

/// Parse one input line. `Ok(None)` for a blank line.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    if let Some(extra) = words.next() {
        return Err(format!("unexpected argument '{extra}'"));
    }

    let command = match (head.to_ascii_lowercase().as_str(), arg) {
        ("play" | "p", None) => Command::Play,
        ("auto", Some(value)) => match value.to_ascii_lowercase().as_str() {
            "on" => Command::Auto(true),
            "off" => Command::Auto(false),
            other => return Err(format!("expected on or off, got '{other}'")),
        },
        ("side", Some(value)) if value.eq_ignore_ascii_case("clear") => Command::Side(None),
        ("side", Some(value)) => Command::Side(Some(value.parse().map_err(|e| format!("{e}"))?)),
        ("style", Some(value)) => Command::Style(value.parse().map_err(|e| format!("{e}"))?),
        ("castle", Some(value)) => {
            Command::Castle(value.parse::<CastlingRights>().map_err(|e| format!("{e}"))?)
        }
        ("help" | "?", None) => Command::Help,
        ("quit" | "exit" | "q", None) => Command::Quit,
        (name, _) => return Err(format!("unknown command '{name}' (try 'help')")),
    };
    Ok(Some(command))
}
