//! Yes/no decisions for destructive operations.

use crate::common::*;

/// Source of answers to a yes/no question.
///
/// The answer is returned raw. Callers validate it with [parse_answer] and ask
/// again on anything else.
pub trait Decider {
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// Interprets an answer. Returns `None` when it is neither yes nor no.
pub fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Asks until a valid yes/no answer is given.
pub fn confirm(decider: &mut dyn Decider, question: &str) -> io::Result<bool> {
    let mut answer = decider.ask(question)?;
    loop {
        match parse_answer(&answer) {
            Some(yes) => return Ok(yes),
            None => answer = decider.ask("Please enter (y/n): ")?,
        }
    }
}

/// Prompts on stderr and reads a line from stdin.
#[derive(Debug, Default)]
pub struct StdinDecider;

impl Decider for StdinDecider {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        let mut stderr = io::stderr();
        write!(stderr, "{}", question)?;
        stderr.flush()?;

        let mut line = String::new();
        let len = io::stdin().lock().read_line(&mut line)?;
        if len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed before an answer was given",
            ));
        }
        Ok(line)
    }
}

/// Gives the same answer to every question.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecider(pub bool);

impl Decider for FixedDecider {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        let answer = if self.0 { "y" } else { "n" };
        info!("{}{}", question, answer);
        Ok(answer.to_owned())
    }
}

/// Replays a fixed list of answers.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecider {
    answers: VecDeque<String>,
    asked: usize,
}

impl ScriptedDecider {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: 0,
        }
    }

    /// Number of questions asked so far.
    pub fn asked(&self) -> usize {
        self.asked
    }
}

impl Decider for ScriptedDecider {
    fn ask(&mut self, _question: &str) -> io::Result<String> {
        self.asked += 1;
        self.answers.pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer left")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_answers() {
        assert_eq!(parse_answer("y\n"), Some(true));
        assert_eq!(parse_answer(" YES "), Some(true));
        assert_eq!(parse_answer("n"), Some(false));
        assert_eq!(parse_answer("No"), Some(false));
        assert_eq!(parse_answer("maybe"), None);
        assert_eq!(parse_answer(""), None);
    }

    #[test]
    fn confirm_asks_again_on_invalid_answer() {
        let mut decider = ScriptedDecider::new(["sure", "", "n"]);
        assert!(!confirm(&mut decider, "overwrite? ").unwrap());
        assert_eq!(decider.asked(), 3);
    }

    #[test]
    fn confirm_fails_when_answers_run_out() {
        let mut decider = ScriptedDecider::new(["what"]);
        let err = confirm(&mut decider, "overwrite? ").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
