//! Deterministic musical planning.
//!
//! A [`Plan`] is derived purely from the prompt, the genre list and the
//! requested duration. No I/O and no randomness: the same inputs always
//! produce byte-identical output.

use serde::{Deserialize, Serialize};

pub const DEFAULT_BPM: u32 = 120;
pub const MIN_TOTAL_BARS: u32 = 32;
pub const MAX_TOTAL_BARS: u32 = 128;
const CHORDS_PER_SECTION: usize = 4;

/// Genre to tempo lookup. Matched case-insensitively against the first genre.
pub const GENRE_BPM: &[(&str, u32)] = &[
    ("techno", 128),
    ("house", 124),
    ("deep house", 122),
    ("trance", 138),
    ("edm", 128),
    ("dubstep", 140),
    ("drum and bass", 174),
    ("dnb", 174),
    ("trap", 140),
    ("hip hop", 90),
    ("hip-hop", 90),
    ("rap", 92),
    ("lofi", 80),
    ("lo-fi", 80),
    ("ambient", 70),
    ("downtempo", 95),
    ("synthwave", 110),
    ("pop", 118),
    ("rock", 120),
    ("metal", 150),
    ("punk", 170),
    ("jazz", 100),
    ("blues", 85),
    ("funk", 108),
    ("disco", 118),
    ("reggae", 76),
    ("rnb", 95),
    ("r&b", 95),
    ("soul", 96),
    ("afrobeat", 105),
    ("latin", 102),
    ("folk", 100),
    ("country", 112),
    ("classical", 90),
    ("cinematic", 85),
];

/// Ordered key palette indexed by the prompt hash.
pub const KEY_PALETTE: &[&str] = &[
    "C major", "G major", "D major", "A major", "E major", "B major", "F major", "E minor",
    "A minor", "D minor", "G minor", "C minor",
];

const MAJOR_CHORDS: &[&str] = &["I", "ii", "iii", "IV", "V", "vi"];
const MINOR_CHORDS: &[&str] = &["i", "ii°", "III", "iv", "v", "VI", "VII"];

/// Fixed section layout: name, share of the total bars, minimum bars.
/// The last section takes the remainder rather than its share.
const SECTION_LAYOUT: &[(&str, f64, u32)] = &[
    ("Intro", 0.15, 4),
    ("A", 0.35, 8),
    ("B", 0.35, 8),
    ("Outro", 0.15, 4),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Major,
    Minor,
}

impl Scale {
    fn chord_pool(self) -> &'static [&'static str] {
        match self {
            Scale::Major => MAJOR_CHORDS,
            Scale::Minor => MINOR_CHORDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub name: String,
    pub bars: u32,
    pub chords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub bpm: u32,
    pub key: String,
    pub scale: Scale,
    pub total_bars: u32,
    pub sections: Vec<Section>,
}

impl Plan {
    /// Frequency of the key's tonic in the third octave, used to tune the
    /// synthesized stems.
    pub fn tonic_hz(&self) -> f64 {
        match self.key.chars().next() {
            Some('C') => 130.81,
            Some('D') => 146.83,
            Some('E') => 164.81,
            Some('F') => 174.61,
            Some('G') => 196.00,
            Some('A') => 220.00,
            Some('B') => 246.94,
            _ => 220.00,
        }
    }

    /// Length of the plan in seconds at its tempo, assuming 4/4.
    pub fn length_secs(&self) -> f64 {
        f64::from(self.total_bars) * 4.0 * 60.0 / f64::from(self.bpm)
    }
}

/// 32-bit rolling string hash (`h = h * 31 + byte`).
pub fn string_hash(input: &str) -> u32 {
    input
        .bytes()
        .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)))
}

pub fn bpm_for_genre(genre: &str) -> Option<u32> {
    let needle = genre.trim().to_lowercase();
    GENRE_BPM
        .iter()
        .find(|(name, _)| *name == needle)
        .map(|(_, bpm)| *bpm)
}

pub fn total_bars(duration_secs: u32, bpm: u32) -> u32 {
    let raw = (f64::from(duration_secs) / 60.0) * (f64::from(bpm) / 4.0);
    // Clamp in f64 first so absurd inputs cannot overflow the cast.
    raw.round()
        .clamp(f64::from(MIN_TOTAL_BARS), f64::from(MAX_TOTAL_BARS)) as u32
}

fn allocate_bars(total: u32) -> Vec<u32> {
    let mut bars = Vec::with_capacity(SECTION_LAYOUT.len());
    let mut used = 0u32;

    for (index, (_, share, min)) in SECTION_LAYOUT.iter().enumerate() {
        let count = if index + 1 == SECTION_LAYOUT.len() {
            total.saturating_sub(used).max(*min)
        } else {
            ((f64::from(total) * share).floor() as u32).max(*min)
        };
        used += count;
        bars.push(count);
    }

    bars
}

fn chords_for(section_name: &str, section_index: usize, scale: Scale) -> Vec<String> {
    let pool = scale.chord_pool();
    (0..CHORDS_PER_SECTION)
        .map(|i| {
            let seed = string_hash(&format!("{}{}", section_name, i)) as usize;
            let index = seed.wrapping_add(section_index).wrapping_add(i) % pool.len();
            pool[index].to_string()
        })
        .collect()
}

/// Computes the plan for a request.
pub fn plan(prompt: &str, genres: &[String], duration_secs: u32) -> Plan {
    let bpm = genres
        .first()
        .and_then(|g| bpm_for_genre(g))
        .unwrap_or(DEFAULT_BPM);

    let key = KEY_PALETTE[string_hash(prompt) as usize % KEY_PALETTE.len()].to_string();
    let scale = if key.contains("minor") {
        Scale::Minor
    } else {
        Scale::Major
    };

    let total_bars = total_bars(duration_secs, bpm);
    let sections = SECTION_LAYOUT
        .iter()
        .zip(allocate_bars(total_bars))
        .enumerate()
        .map(|(index, ((name, _, _), bars))| Section {
            name: name.to_string(),
            bars,
            chords: chords_for(name, index, scale),
        })
        .collect();

    Plan {
        bpm,
        key,
        scale,
        total_bars,
        sections,
    }
}
