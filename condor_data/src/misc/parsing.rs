/// Non-empty run of ASCII digits.
pub fn is_digits(input: &str) -> bool {
    !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit())
}

/// `<digits>.<digits>`, both sides non-empty (no sign, no exponent)
pub fn is_decimal(input: &str) -> bool {
    matches!(input.split_once('.'), Some((int, frac)) if is_digits(int) && is_digits(frac))
}

/// `<digits><sep><digits>`
pub fn is_digit_pair(input: &str, sep: char) -> bool {
    matches!(input.split_once(sep), Some((a, b)) if is_digits(a) && is_digits(b))
}

/// Walks a single line token by token. Tokens are maximal runs of non-whitespace.
///
/// Every method only advances on success, so a failed match leaves the cursor in place and
/// [`Cursor::peek`] still shows what was there.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Skips whitespace, returns how many bytes were skipped.
    pub fn skip_whitespace(&mut self) -> usize {
        let rest = self.rest();
        let skipped = rest.len() - rest.trim_start().len();
        self.pos += skipped;
        skipped
    }

    /// Next token without consuming it (empty at end of line).
    pub fn peek(&self) -> &'a str {
        let rest = self.rest();
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        &rest[..end]
    }

    /// Consumes the next token if `accept` likes it.
    pub fn token(&mut self, accept: impl Fn(&str) -> bool) -> Option<&'a str> {
        let token = self.peek();
        if token.is_empty() || !accept(token) {
            return None;
        }
        self.pos += token.len();
        Some(token)
    }

    /// Two tokens separated by exactly one ASCII space, returned as one slice (`"1/2 03:04"`).
    pub fn token_pair(
        &mut self,
        accept_first: impl Fn(&str) -> bool,
        accept_second: impl Fn(&str) -> bool,
    ) -> Option<&'a str> {
        let start = self.pos;
        let mut probe = self.clone();
        probe.token(accept_first)?;
        probe.input[probe.pos..].strip_prefix(' ')?;
        probe.pos += 1;
        probe.token(accept_second)?;
        self.pos = probe.pos;
        Some(&self.input[start..self.pos])
    }

    /// Everything that is left, verbatim.
    pub fn remainder(&mut self) -> &'a str {
        let rest = self.rest();
        self.pos = self.input.len();
        rest
    }
}

pub mod runtime {
    use std::fmt;

    use chrono::Duration;
    use derive_more::derive::{Deref, Into};
    use thiserror::Error;

    use super::is_digits;

    /// Wall-clock runtime as printed by `condor_q`: `<days>+<hh>:<mm>:<ss>`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deref, Into)]
    pub struct Runtime(pub Duration);

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum RuntimeParseError {
        #[error("runtime `{0}`: expected `<days>+<hh>:<mm>:<ss>`")]
        Shape(String),
        #[error("runtime `{0}`: out of range")]
        OutOfRange(String),
    }

    impl TryFrom<&str> for Runtime {
        type Error = RuntimeParseError;

        fn try_from(value: &str) -> Result<Self, Self::Error> {
            let shape = || RuntimeParseError::Shape(value.to_owned());
            let (days, clock) = value.split_once('+').ok_or_else(shape)?;
            let parts = clock.split(':').collect::<Vec<_>>();
            let [hours, minutes, seconds] = parts.as_slice() else {
                return Err(shape());
            };
            let mut total = Duration::zero();
            for (part, unit) in [(days, 86_400), (hours, 3_600), (minutes, 60), (seconds, 1)] {
                if !is_digits(part) {
                    return Err(shape());
                }
                let secs = part
                    .parse::<i64>()
                    .ok()
                    .and_then(|n| n.checked_mul(unit))
                    .and_then(Duration::try_seconds)
                    .ok_or_else(|| RuntimeParseError::OutOfRange(value.to_owned()))?;
                total = total
                    .checked_add(&secs)
                    .ok_or_else(|| RuntimeParseError::OutOfRange(value.to_owned()))?;
            }
            Ok(Runtime(total))
        }
    }

    impl fmt::Display for Runtime {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let secs = self.0.num_seconds();
            write!(
                f,
                "{}+{:02}:{:02}:{:02}",
                secs / 86_400,
                secs % 86_400 / 3_600,
                secs % 3_600 / 60,
                secs % 60
            )
        }
    }
}

pub use runtime::Runtime;
