//! Line-oriented command language read from stdin.

use rlhf_pages::{PageKind, TextField};

use crate::error::{PlayerError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum ArchAction {
    Next,
    Reset,
    Toggle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Pages,
    Open(PageKind),
    Next,
    Reset,
    Play,
    Pause,
    Speed(f64),
    Set { key: String, value: f64 },
    Params,
    Show,
    Arch(ArchAction),
    Select(Option<usize>),
    Text { field: TextField, text: String },
    Quit,
}

impl Command {
    /// Commands that only read the session and leave the pending tick alone.
    pub fn is_query(&self) -> bool {
        matches!(self, Command::Help | Command::Pages | Command::Params | Command::Show)
    }
}

pub const HELP: &[(&str, &str)] = &[
    ("pages", "List the walkthrough pages"),
    ("open <page|path>", "Switch to a page (key such as `ppo` or route such as `/ppo-visualization`)"),
    ("next", "Advance one step (one SGD step on reward training)"),
    ("reset", "Return the page to its initial state"),
    ("play | pause", "Auto-advance the PPO and reward-training pages"),
    ("speed <ms>", "PPO auto-play delay (500-4000)"),
    ("set <param> <value>", "Set a page parameter; values are clamped to the slider range"),
    ("params", "Show the current page's parameters"),
    ("show", "Print the current snapshot"),
    ("arch next|reset|toggle", "Log-prob page architecture walkthrough"),
    ("select <idx>|none", "Log-prob page: inspect one position's distribution"),
    ("text prompt|chosen|rejected <text>", "Reward pages: replace an input text"),
    ("quit", "Exit"),
];

/// Accepts `true/false`, `on/off`, `yes/no` and `1/0`.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_number(what: &'static str, s: &str) -> Result<f64> {
    if let Some(b) = parse_bool(s) {
        return Ok(if b { 1.0 } else { 0.0 });
    }
    s.parse::<f64>().map_err(|_| PlayerError::InvalidArgument {
        what,
        value: s.to_string(),
    })
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    let cmd = match head {
        "help" | "?" => Command::Help,
        "pages" => Command::Pages,
        "open" => {
            let name = args.next().ok_or(PlayerError::MissingArgument {
                command: "open",
                what: "a page key or path",
            })?;
            let kind = PageKind::parse(name).ok_or_else(|| PlayerError::UnknownPage(name.to_string()))?;
            Command::Open(kind)
        }
        "next" => Command::Next,
        "reset" => Command::Reset,
        "play" => Command::Play,
        "pause" => Command::Pause,
        "speed" => {
            let ms = args.next().ok_or(PlayerError::MissingArgument {
                command: "speed",
                what: "a delay in milliseconds",
            })?;
            Command::Speed(parse_number("delay", ms)?)
        }
        "set" => {
            let key = args.next().ok_or(PlayerError::MissingArgument {
                command: "set",
                what: "a parameter name",
            })?;
            let value = args.next().ok_or(PlayerError::MissingArgument {
                command: "set",
                what: "a value",
            })?;
            Command::Set {
                key: key.to_string(),
                value: parse_number("value", value)?,
            }
        }
        "params" => Command::Params,
        "show" => Command::Show,
        "arch" => match args.next() {
            Some("next") => Command::Arch(ArchAction::Next),
            Some("reset") => Command::Arch(ArchAction::Reset),
            Some("toggle") => Command::Arch(ArchAction::Toggle),
            Some(other) => {
                return Err(PlayerError::InvalidArgument {
                    what: "arch action (next|reset|toggle)",
                    value: other.to_string(),
                })
            }
            None => {
                return Err(PlayerError::MissingArgument {
                    command: "arch",
                    what: "next|reset|toggle",
                })
            }
        },
        "select" => match args.next() {
            Some("none") => Command::Select(None),
            Some(idx) => Command::Select(Some(idx.parse().map_err(|_| PlayerError::InvalidArgument {
                what: "position",
                value: idx.to_string(),
            })?)),
            None => {
                return Err(PlayerError::MissingArgument {
                    command: "select",
                    what: "a position or `none`",
                })
            }
        },
        "text" => {
            let (field, text) = match rest.split_once(char::is_whitespace) {
                Some((f, t)) => (f, t.trim()),
                None => (rest, ""),
            };
            if field.is_empty() {
                return Err(PlayerError::MissingArgument {
                    command: "text",
                    what: "prompt|chosen|rejected",
                });
            }
            let field = TextField::parse(field).ok_or_else(|| PlayerError::InvalidArgument {
                what: "text field (prompt|chosen|rejected)",
                value: field.to_string(),
            })?;
            Command::Text {
                field,
                text: text.to_string(),
            }
        }
        "quit" | "exit" => Command::Quit,
        other => return Err(PlayerError::UnknownCommand(other.to_string())),
    };
    Ok(Some(cmd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   ").unwrap(), None);
        assert_eq!(parse("# next").unwrap(), None);
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse("next").unwrap(), Some(Command::Next));
        assert_eq!(parse(" reset ").unwrap(), Some(Command::Reset));
        assert_eq!(parse("play").unwrap(), Some(Command::Play));
        assert_eq!(parse("quit").unwrap(), Some(Command::Quit));
        assert_eq!(parse("exit").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn open_by_key_or_path() {
        assert_eq!(parse("open ppo").unwrap(), Some(Command::Open(PageKind::Ppo)));
        assert_eq!(
            parse("open /advantage-visualization").unwrap(),
            Some(Command::Open(PageKind::Advantage))
        );
        assert!(matches!(parse("open pong"), Err(PlayerError::UnknownPage(_))));
        assert!(matches!(parse("open"), Err(PlayerError::MissingArgument { .. })));
    }

    #[test]
    fn numeric_and_boolean_values() {
        assert_eq!(
            parse("set clip_eps 0.3").unwrap(),
            Some(Command::Set {
                key: "clip_eps".into(),
                value: 0.3
            })
        );
        assert_eq!(
            parse("set use_value_clip off").unwrap(),
            Some(Command::Set {
                key: "use_value_clip".into(),
                value: 0.0
            })
        );
        assert_eq!(parse("speed 750").unwrap(), Some(Command::Speed(750.0)));
        assert!(matches!(parse("set lr fast"), Err(PlayerError::InvalidArgument { .. })));
        assert!(matches!(parse("set lr"), Err(PlayerError::MissingArgument { .. })));
    }

    #[test]
    fn log_prob_commands() {
        assert_eq!(parse("arch toggle").unwrap(), Some(Command::Arch(ArchAction::Toggle)));
        assert!(parse("arch sideways").is_err());
        assert_eq!(parse("select 3").unwrap(), Some(Command::Select(Some(3))));
        assert_eq!(parse("select none").unwrap(), Some(Command::Select(None)));
        assert!(parse("select -1").is_err());
    }

    #[test]
    fn text_keeps_the_rest_of_the_line() {
        assert_eq!(
            parse("text chosen  Pune is in India, obviously.").unwrap(),
            Some(Command::Text {
                field: TextField::Chosen,
                text: "Pune is in India, obviously.".into()
            })
        );
        assert_eq!(
            parse("text prompt").unwrap(),
            Some(Command::Text {
                field: TextField::Prompt,
                text: String::new()
            })
        );
        assert!(parse("text answer hi").is_err());
        assert!(parse("text").is_err());
    }

    #[test]
    fn queries_are_read_only() {
        for line in ["show", "params", "pages", "help"] {
            assert!(parse(line).unwrap().unwrap().is_query(), "{line}");
        }
        for line in ["next", "reset", "play", "pause", "speed 750", "open ppo", "set lr 0.1"] {
            assert!(!parse(line).unwrap().unwrap().is_query(), "{line}");
        }
    }

    #[test]
    fn unknown_command() {
        assert!(matches!(parse("jump"), Err(PlayerError::UnknownCommand(c)) if c == "jump"));
    }

    #[test]
    fn bool_parsing() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
