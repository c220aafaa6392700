//! Deterministic typing replay.
//!
//! [`Simulation`] yields a finite sequence of timed actions that type a
//! filler text, occasionally hitting a wrong letter, deleting it after a
//! pause, and typing the right one. The same options always produce the same
//! sequence; nothing here reads the wall clock.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::key::Action;

/// Filler text the replay types, repeated to the requested length.
pub const FILLER_TEXT: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. \
    Vestibulum vulputate, nunc sit amet laoreet malesuada, \
    risus mauris fermentum est, nec gravida justo erat sed nunc. ";

/// Pause between a typo and its deletion.
pub const CORRECTION_DELAY_MS: u64 = 250;

/// Extra random jitter added to correction pauses.
const CORRECTION_JITTER_MS: u64 = 100;

/// Replay tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    /// Minimum pause between keystrokes; the actual pause is up to twice this.
    pub base_delay_ms: u64,
    /// Probability that a letter is mistyped first.
    pub error_chance: f64,
    pub seed: u64,
    /// Number of characters of filler text to type.
    pub length: usize,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            base_delay_ms: 20,
            error_chance: 0.06,
            seed: 7,
            length: 300,
        }
    }
}

/// One replayed action and the pause that precedes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedAction {
    pub delay_ms: u64,
    pub action: Action,
}

/// Iterator over a seeded typing replay.
#[derive(Debug)]
pub struct Simulation {
    text: Vec<char>,
    index: usize,
    pending: VecDeque<SimulatedAction>,
    next_delay_ms: u64,
    rng: StdRng,
    options: SimulationOptions,
    typos: u32,
}

impl Simulation {
    pub fn new(options: SimulationOptions) -> Self {
        let text = FILLER_TEXT.chars().cycle().take(options.length).collect();
        Self {
            text,
            index: 0,
            pending: VecDeque::new(),
            next_delay_ms: 0,
            rng: StdRng::seed_from_u64(options.seed),
            options,
            typos: 0,
        }
    }

    /// Typos produced so far. Every typo is corrected.
    pub const fn typos(&self) -> u32 {
        self.typos
    }

    fn keystroke_pause(&mut self) -> u64 {
        let base = self.options.base_delay_ms;
        base + self.rng.gen_range(0..=base)
    }

    fn plan_next(&mut self) -> bool {
        let Some(&correct) = self.text.get(self.index) else {
            return false;
        };
        self.index += 1;

        let delay_ms = self.next_delay_ms;
        let mistyped = correct.is_ascii_alphabetic()
            && self.rng.gen_range(0.0..1.0) < self.options.error_chance;

        if mistyped {
            let wrong = char::from(b'a' + self.rng.gen_range(0..26u8));
            let deletion_delay = CORRECTION_DELAY_MS + self.rng.gen_range(0..=CORRECTION_JITTER_MS);
            let retype_delay =
                self.options.base_delay_ms + self.rng.gen_range(0..=CORRECTION_JITTER_MS);
            self.typos += 1;
            self.pending.extend([
                SimulatedAction {
                    delay_ms,
                    action: Action::TypedChar(wrong),
                },
                SimulatedAction {
                    delay_ms: deletion_delay,
                    action: Action::Deletion(wrong.to_string()),
                },
                SimulatedAction {
                    delay_ms: retype_delay,
                    action: Action::TypedChar(correct),
                },
            ]);
        } else {
            self.pending.push_back(SimulatedAction {
                delay_ms,
                action: Action::TypedChar(correct),
            });
        }

        self.next_delay_ms = self.keystroke_pause();
        true
    }
}

impl Iterator for Simulation {
    type Item = SimulatedAction;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending.is_empty() && !self.plan_next() {
            return None;
        }
        self.pending.pop_front()
    }
}
