/// Letter pools.
///
/// Each pool is a shuffled deck popped from the front and reshuffled only
/// once empty, so a pool never repeats a letter before every letter in it
/// has been dealt. Versus mode deals each player from their own hand of the
/// keyboard; single player deals from the whole alphabet.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::entities::{GameMode, PlayerId};

pub const LEFT_HAND_KEYS: [char; 15] = [
    'Q', 'W', 'E', 'R', 'T', //
    'A', 'S', 'D', 'F', 'G', //
    'Z', 'X', 'C', 'V', 'B',
];

pub const RIGHT_HAND_KEYS: [char; 11] = [
    'Y', 'U', 'I', 'O', 'P', //
    'H', 'J', 'K', 'L', //
    'N', 'M',
];

/// Saved as the `keyboard_layout_manager` record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LetterPool {
    #[serde(default = "default_left_hand", deserialize_with = "left_hand_or_default")]
    left_hand_keys: Vec<char>,
    #[serde(default = "default_right_hand", deserialize_with = "right_hand_or_default")]
    right_hand_keys: Vec<char>,
    #[serde(rename = "current_available_letters_j1", default)]
    left_deck: VecDeque<char>,
    #[serde(rename = "current_available_letters_j2", default)]
    right_deck: VecDeque<char>,
    #[serde(rename = "current_all_letters", default)]
    all_deck: VecDeque<char>,
}

impl LetterPool {
    pub fn new(rng: &mut impl Rng) -> Self {
        Self::with_hands(LEFT_HAND_KEYS.to_vec(), RIGHT_HAND_KEYS.to_vec(), rng)
    }

    pub fn with_hands(left: Vec<char>, right: Vec<char>, rng: &mut impl Rng) -> Self {
        debug_assert!(!left.is_empty() && !right.is_empty(), "empty keyboard partition");
        let mut pool = Self {
            left_hand_keys: left,
            right_hand_keys: right,
            left_deck: VecDeque::new(),
            right_deck: VecDeque::new(),
            all_deck: VecDeque::new(),
        };
        pool.refill_empty(rng);
        pool
    }

    /// Deals the next letter for `player`. In single player every draw comes
    /// from the full alphabet.
    pub fn next_letter(&mut self, mode: GameMode, player: PlayerId, rng: &mut impl Rng) -> char {
        if self.remaining(mode, player).is_empty() {
            let keys = match (mode, player) {
                (GameMode::Versus, PlayerId::J1) => self.left_hand_keys.clone(),
                (GameMode::Versus, PlayerId::J2) => self.right_hand_keys.clone(),
                (GameMode::SinglePlayer, _) => self.alphabet(),
            };
            *self.deck_mut(mode, player) = shuffled(keys, rng);
        }
        // Hands are never empty, so the deck was refilled just above.
        self.deck_mut(mode, player)
            .pop_front()
            .unwrap_or(LEFT_HAND_KEYS[0])
    }

    /// Refills any deck left empty, e.g. after loading an old save.
    pub fn refill_empty(&mut self, rng: &mut impl Rng) {
        if self.left_deck.is_empty() {
            self.left_deck = shuffled(self.left_hand_keys.clone(), rng);
        }
        if self.right_deck.is_empty() {
            self.right_deck = shuffled(self.right_hand_keys.clone(), rng);
        }
        if self.all_deck.is_empty() {
            self.all_deck = shuffled(self.alphabet(), rng);
        }
    }

    /// Every letter either hand can be dealt, without duplicates.
    pub fn alphabet(&self) -> Vec<char> {
        let mut all: Vec<char> = self
            .left_hand_keys
            .iter()
            .chain(self.right_hand_keys.iter())
            .copied()
            .collect();
        all.sort_unstable();
        all.dedup();
        all
    }

    pub fn contains(&self, c: char) -> bool {
        self.left_hand_keys.contains(&c) || self.right_hand_keys.contains(&c)
    }

    pub fn hand(&self, player: PlayerId) -> &[char] {
        match player {
            PlayerId::J1 => &self.left_hand_keys,
            PlayerId::J2 => &self.right_hand_keys,
        }
    }

    /// Letters still waiting in the deck `player` draws from.
    pub fn remaining(&self, mode: GameMode, player: PlayerId) -> &VecDeque<char> {
        match (mode, player) {
            (GameMode::Versus, PlayerId::J1) => &self.left_deck,
            (GameMode::Versus, PlayerId::J2) => &self.right_deck,
            (GameMode::SinglePlayer, _) => &self.all_deck,
        }
    }

    fn deck_mut(&mut self, mode: GameMode, player: PlayerId) -> &mut VecDeque<char> {
        match (mode, player) {
            (GameMode::Versus, PlayerId::J1) => &mut self.left_deck,
            (GameMode::Versus, PlayerId::J2) => &mut self.right_deck,
            (GameMode::SinglePlayer, _) => &mut self.all_deck,
        }
    }
}

fn default_left_hand() -> Vec<char> {
    LEFT_HAND_KEYS.to_vec()
}

fn default_right_hand() -> Vec<char> {
    RIGHT_HAND_KEYS.to_vec()
}

/// An empty saved hand would leave nothing to deal; read it as missing.
fn left_hand_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<char>, D::Error> {
    let keys = Vec::<char>::deserialize(d)?;
    Ok(if keys.is_empty() { default_left_hand() } else { keys })
}

fn right_hand_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<char>, D::Error> {
    let keys = Vec::<char>::deserialize(d)?;
    Ok(if keys.is_empty() { default_right_hand() } else { keys })
}

fn shuffled(mut keys: Vec<char>, rng: &mut impl Rng) -> VecDeque<char> {
    keys.shuffle(rng);
    keys.into()
}
