//! English dialects the dataset covers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::alphabet::Letter;

/// A regional English accent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Accent {
    #[serde(rename = "en-US")]
    Us,
    #[serde(rename = "en-GB")]
    Uk,
    #[serde(rename = "en-AU")]
    Au,
    #[serde(rename = "en-IN")]
    In,
    #[serde(rename = "en-NG")]
    Ng,
    #[serde(rename = "en-CA")]
    Ca,
    #[serde(rename = "en-IE")]
    Ie,
    #[serde(rename = "en-ZA")]
    Za,
}

impl Accent {
    pub const ALL: [Accent; 8] = [
        Accent::Us,
        Accent::Uk,
        Accent::Au,
        Accent::In,
        Accent::Ng,
        Accent::Ca,
        Accent::Ie,
        Accent::Za,
    ];

    /// BCP-47 style dialect tag, e.g. `en-GB`.
    pub fn tag(self) -> &'static str {
        match self {
            Accent::Us => "en-US",
            Accent::Uk => "en-GB",
            Accent::Au => "en-AU",
            Accent::In => "en-IN",
            Accent::Ng => "en-NG",
            Accent::Ca => "en-CA",
            Accent::Ie => "en-IE",
            Accent::Za => "en-ZA",
        }
    }

    /// Short code used in clip file names (`gtts_uk_natural_01_a.wav`).
    pub fn code(self) -> &'static str {
        match self {
            Accent::Us => "us",
            Accent::Uk => "uk",
            Accent::Au => "au",
            Accent::In => "in",
            Accent::Ng => "ng",
            Accent::Ca => "ca",
            Accent::Ie => "ie",
            Accent::Za => "za",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Accent::Us => "American English",
            Accent::Uk => "British English",
            Accent::Au => "Australian English",
            Accent::In => "Indian English",
            Accent::Ng => "Nigerian English",
            Accent::Ca => "Canadian English",
            Accent::Ie => "Irish English",
            Accent::Za => "South African English",
        }
    }

    /// Stem of the voice-cloning reference file (`british_reference.wav`).
    pub fn reference_name(self) -> &'static str {
        match self {
            Accent::Us => "american",
            Accent::Uk => "british",
            Accent::Au => "australian",
            Accent::In => "indian",
            Accent::Ng => "nigerian",
            Accent::Ca => "canadian",
            Accent::Ie => "irish",
            Accent::Za => "south_african",
        }
    }

    /// Google Translate top-level domain that yields this accent.
    pub fn gtts_tld(self) -> &'static str {
        match self {
            Accent::Us => "com",
            Accent::Uk => "co.uk",
            Accent::Au => "com.au",
            Accent::In => "co.in",
            Accent::Ng => "com.ng",
            Accent::Ca => "ca",
            Accent::Ie => "ie",
            Accent::Za => "co.za",
        }
    }

    /// Dialect-specific spelling of a letter's name, if it differs from the
    /// canonical one.
    pub fn rendering(self, letter: Letter) -> Option<&'static str> {
        match (self, letter.as_char()) {
            (Accent::Us, _) => None,
            (_, 'Z') => Some("zed"),
            (Accent::Au | Accent::In | Accent::Ie | Accent::Ng, 'H') => Some("haitch"),
            _ => None,
        }
    }

    /// Text to synthesise for `letter` in this accent.
    pub fn pronunciation(self, letter: Letter) -> &'static str {
        self.rendering(letter).unwrap_or(letter.canonical_name())
    }

    /// Every dialect rendering of `letter` across all accents.
    pub fn all_renderings(letter: Letter) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::new();
        for accent in Accent::ALL {
            if let Some(r) = accent.rendering(letter) {
                if !out.contains(&r) {
                    out.push(r);
                }
            }
        }
        out
    }

    /// Look an accent up by tag (`en-GB`), file code (`uk`) or reference
    /// name (`british`).
    pub fn lookup(s: &str) -> Option<Accent> {
        let needle = s.trim().to_ascii_lowercase().replace('_', "-");
        Accent::ALL.into_iter().find(|a| {
            a.tag().eq_ignore_ascii_case(&needle)
                || a.code() == needle
                || a.reference_name().replace('_', "-") == needle
        })
    }
}

impl fmt::Display for Accent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.tag())
    }
}

impl FromStr for Accent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Accent::lookup(s).ok_or_else(|| format!("unknown accent '{s}'"))
    }
}
