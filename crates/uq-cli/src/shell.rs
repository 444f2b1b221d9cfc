//! Line-oriented interactive session over stdin.

use std::fmt;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use uq_core::{CharClasses, Form, Session};

use crate::host::{LocalSpawner, UrlQuery};

const HELP: &str = "\
commands:
  secret <text>       set the master secret
  subject <text>      set the subject (site name)
  limit <n>           set the length limit (empty for none)
  exclude <codes>     exclude classes: l lower, n numbers, s symbols, u upper
  remember on|off     keep the secret in the durable store
  reset-limit         restore the default length limit
  copy                copy the derived output to the clipboard
  show                print the current inputs
  url                 print the current address
  quit                leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Secret(String),
    Subject(String),
    Limit(String),
    Exclude(String),
    Remember(bool),
    ResetLimit,
    Copy,
    Show,
    Url,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseError {}

impl ShellCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    ///
    /// Arguments run to the end of the line, so values may contain spaces.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }
        let line = line.trim_start();
        let (name, arg) = line.split_once(' ').unwrap_or((line, ""));

        let command = match name {
            "secret" => ShellCommand::Secret(arg.to_string()),
            "subject" => ShellCommand::Subject(arg.to_string()),
            "limit" => ShellCommand::Limit(arg.trim().to_string()),
            "exclude" => ShellCommand::Exclude(arg.trim().to_string()),
            "remember" => match arg.trim() {
                "on" | "yes" | "true" => ShellCommand::Remember(true),
                "off" | "no" | "false" => ShellCommand::Remember(false),
                other => {
                    return Err(ParseError(format!(
                        "remember expects on or off, got {other:?}"
                    )));
                }
            },
            "reset-limit" => ShellCommand::ResetLimit,
            "copy" => ShellCommand::Copy,
            "show" => ShellCommand::Show,
            "url" => ShellCommand::Url,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" => ShellCommand::Quit,
            other => return Err(ParseError(format!("unknown command {other:?}, try help"))),
        };
        Ok(Some(command))
    }
}

/// Drive `form` from stdin until `quit` or end of input.
///
/// Every new derived output is printed as `password: <value>`.
pub async fn run(
    session: &Session,
    form: &Form,
    query: &UrlQuery,
    spawner: &LocalSpawner,
) -> Result<()> {
    spawner.drain().await;
    println!("focus: {}", session.focus());
    session
        .controls()
        .password
        .subscribe(|password| println!("password: {password}"));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match ShellCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        match command {
            ShellCommand::Secret(secret) => form.secret.edit(secret),
            ShellCommand::Subject(subject) => form.subject.edit(subject),
            ShellCommand::Limit(limit) => form.limit.edit(limit),
            ShellCommand::Exclude(code) => form.exclude.edit(CharClasses::from_code(&code)),
            ShellCommand::Remember(on) => form.remember.edit(on),
            ShellCommand::ResetLimit => form.reset_limit.fire(),
            ShellCommand::Copy => form.copy.fire(),
            ShellCommand::Show => show(form),
            ShellCommand::Url => println!("url: {}", query.url()),
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Quit => break,
        }
        spawner.drain().await;
    }
    Ok(())
}

fn show(form: &Form) {
    let exclude = form.exclude.value();
    let names: Vec<&str> = exclude.classes().map(|class| class.name()).collect();
    println!("subject:  {}", form.subject.value());
    println!("limit:    {}", form.limit.value());
    println!("exclude:  {}", names.join(", "));
    println!("remember: {}", if form.remember.value() { "on" } else { "off" });
    println!("password: {}", form.password.value());
}
