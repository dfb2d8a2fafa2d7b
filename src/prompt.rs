use colored::Colorize;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, BufRead, Write};

/// Interactive input the resolution stage may ask the user for.
pub trait Prompter {
    /// Ask for a visible line of input, without the trailing newline.
    fn line(&mut self, label: &str) -> io::Result<String>;

    /// Ask for sensitive input (password, token) without echoing it.
    fn secret(&mut self, label: &str) -> io::Result<String>;

    /// Show informational output to the user.
    fn notice(&mut self, message: &str);
}

/// Prompts on the controlling terminal.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn line(&mut self, label: &str) -> io::Result<String> {
        print!("{}", label.bold());
        io::stdout().flush()?;
        let mut input = String::new();
        let read = io::stdin().lock().read_line(&mut input)?;
        if read == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
        }
        Ok(input.trim_end_matches(['\r', '\n']).to_string())
    }

    fn secret(&mut self, label: &str) -> io::Result<String> {
        print!("{}", label.bold());
        io::stdout().flush()?;
        terminal::enable_raw_mode()?;
        let input = read_hidden_line();
        terminal::disable_raw_mode()?;
        println!();
        input
    }

    fn notice(&mut self, message: &str) {
        println!("{message}");
    }
}

/// Collect key presses until Enter while the terminal is in raw mode.
fn read_hidden_line() -> io::Result<String> {
    let mut input = String::new();
    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        else {
            continue;
        };
        match code {
            KeyCode::Enter => return Ok(input),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "input cancelled"));
            }
            KeyCode::Char(c) => input.push(c),
            _ => {}
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays scripted answers and records every label and notice.
    #[derive(Default)]
    pub struct ScriptedPrompter {
        pub answers: VecDeque<String>,
        pub asked: Vec<String>,
        pub notices: Vec<String>,
    }

    impl ScriptedPrompter {
        pub fn with_answers(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.to_string()).collect(),
                ..Default::default()
            }
        }

        fn next(&mut self, label: &str) -> io::Result<String> {
            self.asked.push(label.to_string());
            self.answers
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer"))
        }
    }

    impl Prompter for ScriptedPrompter {
        fn line(&mut self, label: &str) -> io::Result<String> {
            self.next(label)
        }

        fn secret(&mut self, label: &str) -> io::Result<String> {
            self.next(label)
        }

        fn notice(&mut self, message: &str) {
            self.notices.push(message.to_string());
        }
    }

    #[test]
    fn test_scripted_prompter_replays_in_order() {
        let mut prompter = ScriptedPrompter::with_answers(&["a", "b"]);
        assert_eq!(prompter.line("first: ").unwrap(), "a");
        assert_eq!(prompter.secret("second: ").unwrap(), "b");
        assert!(prompter.line("third: ").is_err());
        assert_eq!(prompter.asked, vec!["first: ", "second: ", "third: "]);
    }
}
