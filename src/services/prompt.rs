//! Operator prompts

use std::io::{self, BufRead, Write};

use crate::error::AppResult;

/// Questions asked to the operator while a job runs
#[cfg_attr(test, mockall::automock)]
pub trait Prompter: Send + Sync {
    /// Ask a yes/no question, `default` is used for an empty answer
    fn confirm(&self, question: &str, default: bool) -> AppResult<bool>;

    /// Let the operator pick one of `options`. `None` means skip.
    fn choose(&self, question: &str, options: &[String]) -> AppResult<Option<usize>>;
}

/// Prompts on the controlling terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, question: &str, default: bool) -> AppResult<bool> {
        confirm_from(&mut io::stdin().lock(), question, default)
    }

    fn choose(&self, question: &str, options: &[String]) -> AppResult<Option<usize>> {
        choose_from(&mut io::stdin().lock(), question, options)
    }
}

/// Print `prompt` and read one answer. Closed input is an error.
fn ask<R: BufRead>(input: &mut R, prompt: &str) -> AppResult<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", prompt)?;
    stdout.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no more input to answer prompt").into());
    }
    Ok(line.trim().to_lowercase())
}

fn confirm_from<R: BufRead>(input: &mut R, question: &str, default: bool) -> AppResult<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    loop {
        let answer = ask(input, &format!("{} {} ", question, hint))?;
        match parse_yes_no(&answer) {
            Some(value) => return Ok(value),
            None if answer.is_empty() => return Ok(default),
            None => println!("Please answer yes or no."),
        }
    }
}

fn choose_from<R: BufRead>(input: &mut R, question: &str, options: &[String]) -> AppResult<Option<usize>> {
    println!("{}", question);
    for (idx, option) in options.iter().enumerate() {
        println!("  {}) {}", idx + 1, option);
    }
    println!("  0) Skip");
    loop {
        let answer = ask(input, "Choice: ")?;
        match answer.parse::<usize>() {
            Ok(0) => return Ok(None),
            Ok(n) if n <= options.len() => return Ok(Some(n - 1)),
            _ => println!("Please enter a number between 0 and {}.", options.len()),
        }
    }
}

/// Answers every question with its default, used in non-interactive mode
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultsPrompter;

impl Prompter for DefaultsPrompter {
    fn confirm(&self, question: &str, default: bool) -> AppResult<bool> {
        tracing::debug!("{} -> {}", question, if default { "yes" } else { "no" });
        Ok(default)
    }

    fn choose(&self, question: &str, _options: &[String]) -> AppResult<Option<usize>> {
        tracing::debug!("{} -> skip", question);
        Ok(None)
    }
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer {
        "y" | "yes" | "j" | "ja" => Some(true),
        "n" | "no" | "nei" => Some(false),
        _ => None,
    }
}
