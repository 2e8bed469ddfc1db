use crate::domain::Status;

/// A parsed session command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddTicket { reference: String, comment: String },
    AddTodo { title: String },
    Select(String),
    Unselect,
    /// Select a todo of the selected ticket by its listed number
    Pick(usize),
    Drop,
    Pause,
    Resume,
    TogglePause,
    SetStatus { id: String, status: Status },
    SetComment { id: String, text: String },
    SetOrder { id: String, order: Option<i64> },
    Rename { id: String, new_id: String },
    SetTodoStatus { index: usize, status: Status },
    SetTodoComment { index: usize, text: String },
    Remove(String),
    RemoveTodo(usize),
    HideDone(bool),
    List,
    Days,
    Save,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("'{0}' is not a todo number")]
    InvalidNumber(String),

    #[error("unknown status '{0}'")]
    InvalidStatus(String),
}

pub const HELP: &str = "\
Commands:
  ticket <id|url> [comment]   add a ticket
  todo <title>                add a todo to the selected ticket
  select <id> | unselect      select a ticket (starts its timer)
  pick <n> | drop             select a todo of the selected ticket
  pause | resume | p          stop, restart or toggle all timers
  status <id> <status>        set a ticket status
  comment <id> <text>         set a ticket comment
  order <id> <n|->            set or clear a ticket sort key
  rename <old> <new>          change a ticket id
  todo-status <n> <status>    set a todo status
  todo-comment <n> <text>     set a todo comment
  rm <id> | rm-todo <n>       remove a ticket or todo
  hide on|off                 hide done tickets and todos
  ls | days                   list tickets, show per-day totals
  save | help | quit";

/// Split off the first whitespace-delimited word
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.find(char::is_whitespace) {
        Some(pos) => (&input[..pos], input[pos..].trim_start()),
        None => (input, ""),
    }
}

fn required<'a>(value: &'a str, usage: &'static str) -> Result<&'a str, ParseError> {
    if value.is_empty() {
        Err(ParseError::Usage(usage))
    } else {
        Ok(value)
    }
}

/// Listed todo numbers start at 1
fn todo_number(word: &str) -> Result<usize, ParseError> {
    match word.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(ParseError::InvalidNumber(word.to_string())),
    }
}

fn status(word: &str) -> Result<Status, ParseError> {
    Status::from_tag(word).ok_or_else(|| ParseError::InvalidStatus(word.to_string()))
}

/// Parse one input line
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let (name, rest) = split_word(line);
    if name.is_empty() {
        return Err(ParseError::Empty);
    }

    let command = match name.to_ascii_lowercase().as_str() {
        "ticket" | "add" => {
            let (reference, comment) = split_word(rest);
            Command::AddTicket {
                reference: required(reference, "ticket <id|url> [comment]")?.to_string(),
                comment: comment.to_string(),
            }
        }
        "todo" => Command::AddTodo {
            title: required(rest, "todo <title>")?.to_string(),
        },
        "select" => Command::Select(required(rest, "select <id>")?.to_string()),
        "unselect" => Command::Unselect,
        "pick" => Command::Pick(todo_number(required(rest, "pick <n>")?)?),
        "drop" => Command::Drop,
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "p" | "toggle" => Command::TogglePause,
        "status" => {
            let (id, value) = split_word(rest);
            let usage = "status <id> <status>";
            Command::SetStatus {
                id: required(id, usage)?.to_string(),
                status: status(required(value, usage)?)?,
            }
        }
        "comment" => {
            let (id, text) = split_word(rest);
            Command::SetComment {
                id: required(id, "comment <id> <text>")?.to_string(),
                text: text.to_string(),
            }
        }
        "order" => {
            let (id, value) = split_word(rest);
            let usage = "order <id> <n|->";
            let id = required(id, usage)?.to_string();
            let order = match required(value, usage)? {
                "-" => None,
                n => Some(n.parse::<i64>().map_err(|_| ParseError::Usage(usage))?),
            };
            Command::SetOrder { id, order }
        }
        "rename" => {
            let (id, new_id) = split_word(rest);
            let usage = "rename <old> <new>";
            Command::Rename {
                id: required(id, usage)?.to_string(),
                new_id: required(new_id, usage)?.to_string(),
            }
        }
        "todo-status" => {
            let (n, value) = split_word(rest);
            let usage = "todo-status <n> <status>";
            Command::SetTodoStatus {
                index: todo_number(required(n, usage)?)?,
                status: status(required(value, usage)?)?,
            }
        }
        "todo-comment" => {
            let (n, text) = split_word(rest);
            Command::SetTodoComment {
                index: todo_number(required(n, "todo-comment <n> <text>")?)?,
                text: text.to_string(),
            }
        }
        "rm" => Command::Remove(required(rest, "rm <id>")?.to_string()),
        "rm-todo" => Command::RemoveTodo(todo_number(required(rest, "rm-todo <n>")?)?),
        "hide" => match rest.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" => Command::HideDone(true),
            "off" | "no" | "false" => Command::HideDone(false),
            _ => return Err(ParseError::Usage("hide on|off")),
        },
        "ls" | "list" => Command::List,
        "days" => Command::Days,
        "save" => Command::Save,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(command)
}
