//! Login code buffer filled one keypad press at a time.

/// Number of digits in a Telegram login code.
pub const CODE_LENGTH: usize = 5;

/// Result of a successful [`CodeBuffer::push`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeProgress {
    /// More digits are needed; holds how many have been entered.
    Incomplete(usize),
    /// The buffer holds exactly [`CODE_LENGTH`] digits.
    Complete,
}

/// Ordered decimal digits, never longer than [`CODE_LENGTH`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeBuffer {
    digits: String,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one digit. Returns `None` (and changes nothing) when `digit` is
    /// not `0..=9` or the buffer is already full.
    pub fn push(&mut self, digit: u8) -> Option<CodeProgress> {
        if digit > 9 || self.is_complete() {
            return None;
        }
        self.digits.push(char::from(b'0' + digit));
        Some(if self.is_complete() {
            CodeProgress::Complete
        } else {
            CodeProgress::Incomplete(self.digits.len())
        })
    }

    /// Remove the last digit, if any.
    pub fn pop(&mut self) -> Option<char> {
        self.digits.pop()
    }

    pub fn clear(&mut self) {
        self.digits.clear();
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.digits.len() == CODE_LENGTH
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }
}
