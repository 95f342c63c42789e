//! Fuzz target: `CodeEntry` under arbitrary button traffic
//!
//! Every 3 input bytes are one poll: a time step and the two button
//! levels.  The session must never record more keys than the code has
//! and must stay complete once closed.
//!
//! cargo fuzz run fuzz_code_entry

#![no_main]

use bikehorn::code_entry::{CodeEntry, EntryOutcome, MAX_CODE_LENGTH, encode_code};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&header, polls)) = data.split_first() else {
        return;
    };
    let length = header % MAX_CODE_LENGTH + 1;
    let mut entry = CodeEntry::new(encode_code(u16::from(header) << 1, length), 50);
    let mut now = 0u32;
    entry.start(now);

    for poll in polls.chunks_exact(3) {
        now = now.wrapping_add(u32::from(poll[0]));
        let horn = poll[1] & 1 == 1;
        let mode = poll[2] & 1 == 1;
        let times_up = poll[2] == 0xFF;
        match entry.play_with_background(now, horn, mode, times_up) {
            EntryOutcome::Pending | EntryOutcome::FailedAttempt => {
                assert!((0..=length as i8).contains(&entry.remaining()));
            }
            EntryOutcome::Accepted => assert!(entry.check()),
            EntryOutcome::TimedOut => assert!(times_up),
        }
    }
});
