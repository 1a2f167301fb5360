use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use kindred_types::api::ReportType;
use kindred_types::models::{ConversationId, UserId};

pub const HELP: &str = "\
commands:
  list                              show new matches and active chats
  open <conversation>               open a conversation by id
  chat <user>                       open the chat with a matched user
  back                              close the open chat
  send <text>                       send a message to the open chat
  show                              print the open chat
  unlike <user>                     unlike a user
  block <user>                      block a user
  report <user> <type> [details]    start a report (inappropriate|fake|harassment|spam|other)
  proof <path>                      attach a proof photo to the report
  submit                            submit the report
  cancel                            discard the report
  help                              show this help
  quit                              exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Open(ConversationId),
    Chat(UserId),
    Back,
    Send(String),
    Show,
    Unlike(UserId),
    Block(UserId),
    Report {
        user_id: UserId,
        report_type: ReportType,
        description: String,
    },
    Proof(PathBuf),
    Submit,
    Cancel,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`, type `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("`{0}` is not a valid id")]
    BadId(String),
    #[error("unknown report type `{0}`")]
    BadReportType(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "list" | "ls" => Ok(Self::List),
            "open" => Ok(Self::Open(id(rest, "open <conversation>")?)),
            "chat" => Ok(Self::Chat(id(rest, "chat <user>")?)),
            "back" => Ok(Self::Back),
            "send" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("send <text>"));
                }
                Ok(Self::Send(rest.to_string()))
            }
            "show" => Ok(Self::Show),
            "unlike" => Ok(Self::Unlike(id(rest, "unlike <user>")?)),
            "block" => Ok(Self::Block(id(rest, "block <user>")?)),
            "report" => parse_report(rest),
            "proof" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("proof <path>"));
                }
                Ok(Self::Proof(PathBuf::from(rest)))
            }
            "submit" => Ok(Self::Submit),
            "cancel" => Ok(Self::Cancel),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn id(raw: &str, usage: &'static str) -> Result<i64, CommandError> {
    if raw.is_empty() {
        return Err(CommandError::Usage(usage));
    }
    raw.parse().map_err(|_| CommandError::BadId(raw.to_string()))
}

fn parse_report(rest: &str) -> Result<Command, CommandError> {
    const USAGE: &str = "report <user> <type> [details]";
    let mut parts = rest.splitn(3, char::is_whitespace);
    let user_id = id(parts.next().unwrap_or_default(), USAGE)?;
    let raw_type = parts.next().ok_or(CommandError::Usage(USAGE))?;
    let report_type = raw_type
        .parse()
        .map_err(|_| CommandError::BadReportType(raw_type.to_string()))?;
    let description = parts.next().unwrap_or_default().trim().to_string();
    Ok(Command::Report {
        user_id,
        report_type,
        description,
    })
}
