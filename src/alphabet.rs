//! The 26 letters of the English alphabet and how they are spoken.
//!
//! Every letter has one *canonical name* (the spelling fed to the TTS
//! engines by default, e.g. `"ay"` for A), a handful of *variant* spellings a
//! speech recogniser is known to produce for it, and membership in an
//! acoustic *confusable group* (the classic E-set `B C D E G P T V Z` and
//! friends).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single uppercase letter A–Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Letter(char);

const CANONICAL_NAMES: [&str; 26] = [
    "ay", "bee", "see", "dee", "ee", "eff", "gee", "aitch", "eye", "jay", "kay", "ell", "em",
    "en", "oh", "pee", "queue", "ar", "ess", "tee", "you", "vee", "double you", "ex", "why",
    "zee",
];

const VARIANT_NAMES: [&[&str]; 26] = [
    &["aye", "eh", "ey"],
    &["be"],
    &["sea", "cee"],
    &["de"],
    &["ea", "e e"],
    &["ef"],
    &["ge", "jee"],
    &["aych", "ache", "eych"],
    &["aye", "ai"],
    &["jey"],
    &["kaye", "ka"],
    &["el", "elle"],
    &["emm"],
    &["enn"],
    &["owe", "o h"],
    &["pe"],
    &["que", "cue", "kyu"],
    &["arr", "are"],
    &["es", "ass"],
    &["te", "tea"],
    &["yoo", "ewe"],
    &["ve"],
    &["double u", "dub", "dubya"],
    &["eks", "ecks"],
    &["wy", "wye"],
    &["ze"],
];

const CONFUSABLE_GROUPS: [&str; 6] = ["BCDEGPTVZ", "MN", "FSX", "AHJK", "IY", "QUW"];

impl Letter {
    /// Build a letter from a char, case-insensitively.
    pub fn new(ch: char) -> Option<Self> {
        let upper = ch.to_ascii_uppercase();
        upper.is_ascii_uppercase().then_some(Self(upper))
    }

    /// Parse a single-letter string such as `"A"` or `"a"`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Self::new(ch),
            _ => None,
        }
    }

    /// All letters in alphabetical order.
    pub fn all() -> impl Iterator<Item = Letter> {
        ('A'..='Z').map(Letter)
    }

    pub fn as_char(self) -> char {
        self.0
    }

    pub fn lowercase(self) -> char {
        self.0.to_ascii_lowercase()
    }

    fn index(self) -> usize {
        (self.0 as u8 - b'A') as usize
    }

    /// The spelling used as synthesis text when no dialect rendering applies.
    pub fn canonical_name(self) -> &'static str {
        CANONICAL_NAMES[self.index()]
    }

    /// Alternative spellings of the letter's name.
    pub fn variant_names(self) -> &'static [&'static str] {
        VARIANT_NAMES[self.index()]
    }

    /// Letters that are acoustically easy to mistake for this one.
    pub fn confusables(self) -> Vec<Letter> {
        CONFUSABLE_GROUPS
            .iter()
            .filter(|group| group.contains(self.0))
            .flat_map(|group| group.chars())
            .filter(|&ch| ch != self.0)
            .map(Letter)
            .collect()
    }

    pub fn is_confusable_with(self, other: Letter) -> bool {
        self != other
            && CONFUSABLE_GROUPS
                .iter()
                .any(|group| group.contains(self.0) && group.contains(other.0))
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Letter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Letter::parse(s).ok_or_else(|| format!("'{s}' is not a letter A-Z"))
    }
}

impl TryFrom<String> for Letter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Letter> for String {
    fn from(letter: Letter) -> Self {
        letter.0.to_string()
    }
}

/// Parse a compact letter list such as `"ABC"` or `"a,b,c"`.
pub fn parse_letters(spec: &str) -> Result<Vec<Letter>, String> {
    let mut letters = Vec::new();
    for ch in spec.chars().filter(|c| !c.is_whitespace() && *c != ',') {
        let letter = Letter::new(ch).ok_or_else(|| format!("'{ch}' is not a letter A-Z"))?;
        if !letters.contains(&letter) {
            letters.push(letter);
        }
    }
    Ok(letters)
}
