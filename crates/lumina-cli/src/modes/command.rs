//! Interactive chat input parsing.

use std::path::PathBuf;

pub const HELP_TEXT: &str = "\
Commands:
  :q, :quit          Exit
  :help              Show this help
  :regen [N]         New reply for message N (default: last user message)
  :edit N TEXT       Replace the text of user message N
  :history           List messages with their numbers
  :model [ID]        Show models, or switch to ID
  :copy              Copy the last reply
  :code N            Copy code block N of the last reply
  :export PATH       Save the conversation (HTML, or JSON for *.json)
Anything else is sent as a message. Ctrl+C stops a reply in progress.";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Send(String),
    Quit,
    Help,
    /// 1-based message number; `None` means the last user message.
    Regenerate(Option<usize>),
    Edit { number: usize, text: String },
    History,
    Model(Option<String>),
    Copy,
    Code(usize),
    Export(PathBuf),
    Empty,
    Invalid(String),
}

fn parse_number(raw: &str, usage: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("Expected a message number, got '{raw}'. Usage: {usage}")),
    }
}

/// Parses a line. Lines not starting with `:` are messages, sent verbatim
/// (minus the line ending).
pub fn parse(line: &str) -> ReplCommand {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return ReplCommand::Empty;
    }
    let Some(rest) = line.trim_start().strip_prefix(':') else {
        return ReplCommand::Send(line.to_string());
    };

    let (name, args) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(n, a)| (n, a.trim()));

    let result = match name {
        "q" | "quit" | "exit" => Ok(ReplCommand::Quit),
        "help" | "h" => Ok(ReplCommand::Help),
        "history" => Ok(ReplCommand::History),
        "copy" => Ok(ReplCommand::Copy),
        "regen" => {
            if args.is_empty() {
                Ok(ReplCommand::Regenerate(None))
            } else {
                parse_number(args, ":regen [N]").map(|n| ReplCommand::Regenerate(Some(n)))
            }
        }
        "edit" => {
            let (number, text) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
            if text.trim().is_empty() {
                Err("Usage: :edit N TEXT".to_string())
            } else {
                parse_number(number, ":edit N TEXT").map(|number| ReplCommand::Edit {
                    number,
                    text: text.trim().to_string(),
                })
            }
        }
        "model" => Ok(ReplCommand::Model((!args.is_empty()).then(|| args.to_string()))),
        "code" => parse_number(args, ":code N").map(ReplCommand::Code),
        "export" => {
            if args.is_empty() {
                Err("Usage: :export PATH".to_string())
            } else {
                Ok(ReplCommand::Export(PathBuf::from(args)))
            }
        }
        other => Err(format!("Unknown command ':{other}'. Type :help for commands.")),
    };

    result.unwrap_or_else(ReplCommand::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_sent() {
        assert_eq!(parse("hola mundo\n"), ReplCommand::Send("hola mundo".to_string()));
        assert_eq!(parse("   \n"), ReplCommand::Empty);
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse(":q"), ReplCommand::Quit);
        assert_eq!(parse(":quit"), ReplCommand::Quit);
        assert_eq!(parse(":help"), ReplCommand::Help);
        assert_eq!(parse(":history"), ReplCommand::History);
        assert_eq!(parse(":copy"), ReplCommand::Copy);
    }

    #[test]
    fn test_regen_with_optional_number() {
        assert_eq!(parse(":regen"), ReplCommand::Regenerate(None));
        assert_eq!(parse(":regen 3"), ReplCommand::Regenerate(Some(3)));
        assert!(matches!(parse(":regen zero"), ReplCommand::Invalid(_)));
        assert!(matches!(parse(":regen 0"), ReplCommand::Invalid(_)));
    }

    #[test]
    fn test_edit_keeps_text_spacing() {
        assert_eq!(
            parse(":edit 1 nuevo  texto"),
            ReplCommand::Edit {
                number: 1,
                text: "nuevo  texto".to_string()
            }
        );
        assert!(matches!(parse(":edit 1"), ReplCommand::Invalid(_)));
        assert!(matches!(parse(":edit x hola"), ReplCommand::Invalid(_)));
    }

    #[test]
    fn test_model_and_export() {
        assert_eq!(parse(":model"), ReplCommand::Model(None));
        assert_eq!(
            parse(":model gemma2-9b-it"),
            ReplCommand::Model(Some("gemma2-9b-it".to_string()))
        );
        assert_eq!(parse(":export chat.json"), ReplCommand::Export(PathBuf::from("chat.json")));
        assert!(matches!(parse(":export"), ReplCommand::Invalid(_)));
    }

    #[test]
    fn test_code_requires_number() {
        assert_eq!(parse(":code 2"), ReplCommand::Code(2));
        assert!(matches!(parse(":code"), ReplCommand::Invalid(_)));
    }

    #[test]
    fn test_unknown_command() {
        let ReplCommand::Invalid(msg) = parse(":dance") else {
            panic!("expected invalid");
        };
        assert!(msg.contains(":dance"));
    }
}
