//! Built-in tunes and a minimal fixed-table player.
//!
//! This is deliberately not a general tune decoder: it plays a handful of
//! compiled-in note tables plus the warble sweep, which is all the alarm
//! and the horn button need.  A second "overlay" voice can borrow the
//! speaker for a short beep while the main voice keeps time silently.

use super::ToneOutput;
use super::warble::Warble;
use crate::app::ports::{Tune, TuneStream};
use crate::config::WarbleConfig;

/// One step of a tune.  `freq_hz == 0` is a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub freq_hz: u16,
    pub ms: u16,
}

const fn n(freq_hz: u16, ms: u16) -> Note {
    Note { freq_hz, ms }
}

/// `repeats` value for a pattern that loops until stopped.
pub const FOREVER: u8 = 0;

/// A note table played `repeats` times, or endlessly for [`FOREVER`].
pub struct Pattern {
    pub notes: &'static [Note],
    pub repeats: u8,
}

impl Pattern {
    /// `None` for an endless pattern.
    pub fn duration_ms(&self) -> Option<u32> {
        if self.repeats == FOREVER {
            return None;
        }
        Some(self.notes.iter().map(|n| u32::from(n.ms)).sum::<u32>() * u32::from(self.repeats))
    }
}

pub static ACKNOWLEDGE: Pattern = Pattern {
    notes: &[n(1760, 80), n(0, 40), n(2349, 120)],
    repeats: 1,
};

pub static ERROR_BEEP: Pattern = Pattern {
    notes: &[n(392, 150), n(0, 60), n(392, 150)],
    repeats: 1,
};

/// One short pip per second for 15 s.
pub static COUNTDOWN: Pattern = Pattern {
    notes: &[n(2093, 100), n(0, 900)],
    repeats: 15,
};

const DOT: u16 = 120;
const DASH: u16 = 3 * DOT;
const SOS_HZ: u16 = 1760;

/// Morse SOS with standard spacing: one dot between elements, three
/// between letters, seven before the repeat.
pub static SOS: Pattern = Pattern {
    notes: &[
        n(SOS_HZ, DOT), n(0, DOT), n(SOS_HZ, DOT), n(0, DOT), n(SOS_HZ, DOT), n(0, 3 * DOT),
        n(SOS_HZ, DASH), n(0, DOT), n(SOS_HZ, DASH), n(0, DOT), n(SOS_HZ, DASH), n(0, 3 * DOT),
        n(SOS_HZ, DOT), n(0, DOT), n(SOS_HZ, DOT), n(0, DOT), n(SOS_HZ, DOT), n(0, 7 * DOT),
    ],
    repeats: FOREVER,
};

fn pattern(tune: Tune) -> Option<&'static Pattern> {
    match tune {
        Tune::Acknowledge => Some(&ACKNOWLEDGE),
        Tune::Countdown => Some(&COUNTDOWN),
        Tune::Error => Some(&ERROR_BEEP),
        Tune::Sos => Some(&SOS),
        Tune::Warble => None,
    }
}

// ---------------------------------------------------------------------------
// Track cursor
// ---------------------------------------------------------------------------

enum Step {
    Same,
    Next(Note),
    Done,
}

struct Track {
    pattern: &'static Pattern,
    index: usize,
    pass: u8,
    note_end_us: u64,
}

impl Track {
    fn start(pattern: &'static Pattern, now_us: u64) -> Option<(Self, Note)> {
        let first = *pattern.notes.first()?;
        let track = Self {
            pattern,
            index: 0,
            pass: 0,
            note_end_us: now_us + u64::from(first.ms) * 1000,
        };
        Some((track, first))
    }

    fn current(&self) -> Note {
        self.pattern.notes[self.index]
    }

    fn poll(&mut self, now_us: u64) -> Step {
        if now_us < self.note_end_us {
            return Step::Same;
        }
        self.index += 1;
        if self.index == self.pattern.notes.len() {
            self.index = 0;
            self.pass = self.pass.saturating_add(1);
            if self.pattern.repeats != FOREVER && self.pass >= self.pattern.repeats {
                return Step::Done;
            }
        }
        let note = self.current();
        self.note_end_us += u64::from(note.ms) * 1000;
        Step::Next(note)
    }
}

enum Voice {
    Notes(Track),
    Warble,
}

/// Swallows tone commands while the overlay owns the speaker.
struct Mute;

impl ToneOutput for Mute {
    fn play(&mut self, _frequency_hz: u16) {}
    fn change(&mut self, _frequency_hz: u16) {}
    fn stop(&mut self) {}
}

fn sound(tone: &mut impl ToneOutput, note: Note) {
    if note.freq_hz == 0 {
        tone.stop();
    } else {
        tone.play(note.freq_hz);
    }
}

// ---------------------------------------------------------------------------
// SequencePlayer
// ---------------------------------------------------------------------------

pub struct SequencePlayer<O: ToneOutput> {
    tone: O,
    warble: Warble,
    main: Option<Voice>,
    overlay: Option<Track>,
}

impl<O: ToneOutput> SequencePlayer<O> {
    pub fn new(tone: O, warble: &WarbleConfig) -> Self {
        Self {
            tone,
            warble: Warble::new(warble),
            main: None,
            overlay: None,
        }
    }

    pub fn tone(&self) -> &O {
        &self.tone
    }

    pub fn tone_mut(&mut self) -> &mut O {
        &mut self.tone
    }

    pub fn is_overlaying(&self) -> bool {
        self.overlay.is_some()
    }

    /// Give the speaker back to the main voice after an overlay.
    fn resume_main(&mut self) {
        match &self.main {
            Some(Voice::Notes(track)) => sound(&mut self.tone, track.current()),
            Some(Voice::Warble) => self.tone.play(self.warble.frequency()),
            None => self.tone.stop(),
        }
    }

    fn silence(&mut self) {
        if self.warble.is_active() {
            self.warble.stop(&mut self.tone);
        } else {
            self.tone.stop();
        }
    }
}

impl<O: ToneOutput> TuneStream for SequencePlayer<O> {
    fn play(&mut self, tune: Tune, now_us: u64) {
        self.overlay = None;
        self.silence();
        match pattern(tune) {
            Some(p) => {
                self.main = Track::start(p, now_us).map(|(track, first)| {
                    sound(&mut self.tone, first);
                    Voice::Notes(track)
                });
            }
            None => {
                self.warble.start(&mut self.tone, now_us);
                self.main = Some(Voice::Warble);
            }
        }
    }

    fn overlay(&mut self, tune: Tune, now_us: u64) {
        if self.main.is_none() {
            self.play(tune, now_us);
            return;
        }
        // The sweep is a main voice only.
        let Some(p) = pattern(tune) else { return };
        if let Some((track, first)) = Track::start(p, now_us) {
            sound(&mut self.tone, first);
            self.overlay = Some(track);
        }
    }

    fn is_playing(&self) -> bool {
        self.main.is_some()
    }

    fn update(&mut self, now_us: u64) {
        let overlaid = self.overlay.is_some();

        match &mut self.main {
            Some(Voice::Notes(track)) => match track.poll(now_us) {
                Step::Same => {}
                Step::Next(note) => {
                    if !overlaid {
                        sound(&mut self.tone, note);
                    }
                }
                Step::Done => {
                    self.main = None;
                    if !overlaid {
                        self.tone.stop();
                    }
                }
            },
            Some(Voice::Warble) => {
                if overlaid {
                    self.warble.update(&mut Mute, now_us);
                } else {
                    self.warble.update(&mut self.tone, now_us);
                }
            }
            None => {}
        }

        if let Some(track) = &mut self.overlay {
            match track.poll(now_us) {
                Step::Same => {}
                Step::Next(note) => sound(&mut self.tone, note),
                Step::Done => {
                    self.overlay = None;
                    self.resume_main();
                }
            }
        }
    }

    fn stop(&mut self) {
        self.main = None;
        self.overlay = None;
        self.silence();
    }
}
