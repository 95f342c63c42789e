//! Two-button binary PIN entry.
//!
//! A code is a 16-bit word: the low nibble is the number of presses
//! (at most [`MAX_CODE_LENGTH`]), the upper 12 bits the expected presses,
//! first press in the most significant used bit.  The horn button enters
//! a `1`, the mode button a `0`.
//!
//! ```text
//!   encode_code(0b101, 3)  =  0000_0000_0101_0011
//!                             └─ sequence ─┘└len┘
//! ```

use log::{debug, info, warn};

/// Longest code that fits in the upper 12 bits.
pub const MAX_CODE_LENGTH: u8 = 12;

/// Pack a press sequence and its length into a code word.
pub const fn encode_code(sequence: u16, length: u8) -> u16 {
    (sequence << 4) | (length as u16 & 0xF)
}

/// Number of presses a code expects.
pub const fn code_length(code: u16) -> u8 {
    (code & 0xF) as u8
}

/// Result of one [`CodeEntry::play_with_background`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Still collecting presses.
    Pending,
    /// A full code was entered and did not match.  Entry restarted.
    FailedAttempt,
    /// The code matched.
    Accepted,
    /// The caller's deadline passed before a match.
    TimedOut,
}

/// One PIN entry session.
#[derive(Debug, Clone)]
pub struct CodeEntry {
    code: u16,
    remaining: i8,
    accumulated: u16,
    last_edge_ms: u32,
    debounce_ms: u32,
    attempts: u16,
}

impl CodeEntry {
    /// A length outside `1..=MAX_CODE_LENGTH` is clamped into range, so an
    /// empty code can never open on the first poll.
    pub fn new(code: u16, debounce_ms: u32) -> Self {
        let length = code_length(code);
        let code = if (1..=MAX_CODE_LENGTH).contains(&length) {
            code
        } else {
            warn!("code entry: code length {} out of range, clamped", length);
            encode_code(code >> 4, length.clamp(1, MAX_CODE_LENGTH))
        };
        Self {
            code,
            remaining: code_length(code) as i8,
            accumulated: 0,
            last_edge_ms: 0,
            debounce_ms,
            attempts: 0,
        }
    }

    /// Reset for a fresh attempt.
    ///
    /// The debounce timer is pre-dated so that a button already held when
    /// the session opens registers on the first [`update`](Self::update).
    pub fn start(&mut self, now_ms: u32) {
        self.remaining = code_length(self.code) as i8;
        self.accumulated = 0;
        self.last_edge_ms = now_ms.wrapping_sub(self.debounce_ms.wrapping_add(1));
    }

    /// Shift one press into the buffer.  Returns `true` once the buffer is
    /// full, and on every call after that.
    pub fn add(&mut self, press: bool) -> bool {
        if self.remaining <= 0 {
            return true;
        }
        self.remaining -= 1;
        self.accumulated |= u16::from(press) << self.remaining;
        self.remaining == 0
    }

    /// Poll the buttons.  Returns `true` when enough presses are collected.
    ///
    /// A press counts only after a quiet period of `debounce_ms` since the
    /// last edge and only when exactly one button is down.  Any held
    /// button inside the quiet period keeps extending it.
    pub fn update(&mut self, now_ms: u32, horn: bool, mode: bool) -> bool {
        if self.remaining <= 0 {
            return true;
        }
        if now_ms.wrapping_sub(self.last_edge_ms) > self.debounce_ms {
            match (horn, mode) {
                (true, false) | (false, true) => {
                    self.last_edge_ms = now_ms;
                    debug!("code entry: {}", u8::from(horn));
                    return self.add(horn);
                }
                (true, true) => self.last_edge_ms = now_ms,
                (false, false) => {}
            }
        } else if horn || mode {
            self.last_edge_ms = now_ms;
        }
        false
    }

    /// Does the collected input match the code?
    pub fn check(&self) -> bool {
        (self.code & !0xF) == (self.accumulated << 4)
    }

    /// One step of code entry against a background tune.
    ///
    /// `times_up` is the caller's deadline signal (tune finished or time
    /// limit reached) and is honoured before any input.  A match is only
    /// reported as the last press lands, so a partial entry whose missing
    /// presses happen to be zeros never unlocks.  A wrong code restarts
    /// entry and keeps going until the deadline.
    pub fn play_with_background(
        &mut self,
        now_ms: u32,
        horn: bool,
        mode: bool,
        times_up: bool,
    ) -> EntryOutcome {
        if times_up {
            return EntryOutcome::TimedOut;
        }
        if !self.update(now_ms, horn, mode) {
            return EntryOutcome::Pending;
        }
        if self.check() {
            info!("code entry: accepted");
            return EntryOutcome::Accepted;
        }
        self.attempts = self.attempts.saturating_add(1);
        info!("code entry: failed attempt {}", self.attempts);
        self.restart(now_ms);
        EntryOutcome::FailedAttempt
    }

    /// Like [`start`](Self::start), but the key that closed the failed
    /// attempt has to be released before the next digit counts.
    fn restart(&mut self, now_ms: u32) {
        self.start(now_ms);
        self.last_edge_ms = now_ms;
    }

    pub fn remaining(&self) -> i8 {
        self.remaining
    }

    pub fn accumulated(&self) -> u16 {
        self.accumulated
    }

    pub fn attempts(&self) -> u16 {
        self.attempts
    }

    pub fn reset_attempts(&mut self) {
        self.attempts = 0;
    }
}
