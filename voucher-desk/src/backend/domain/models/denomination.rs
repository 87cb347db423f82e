use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Currency note values tracked by the cash drawer, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Denomination {
    R500,
    R200,
    R100,
    R50,
    R20,
    R10,
    R5,
    R2,
    R1,
}

impl Denomination {
    /// Every denomination in descending value order
    pub const ALL: [Denomination; 9] = [
        Denomination::R500,
        Denomination::R200,
        Denomination::R100,
        Denomination::R50,
        Denomination::R20,
        Denomination::R10,
        Denomination::R5,
        Denomination::R2,
        Denomination::R1,
    ];

    pub const fn value(self) -> u32 {
        match self {
            Denomination::R500 => 500,
            Denomination::R200 => 200,
            Denomination::R100 => 100,
            Denomination::R50 => 50,
            Denomination::R20 => 20,
            Denomination::R10 => 10,
            Denomination::R5 => 5,
            Denomination::R2 => 2,
            Denomination::R1 => 1,
        }
    }

    /// Position inside [`Denomination::ALL`]
    pub const fn index(self) -> usize {
        match self {
            Denomination::R500 => 0,
            Denomination::R200 => 1,
            Denomination::R100 => 2,
            Denomination::R50 => 3,
            Denomination::R20 => 4,
            Denomination::R10 => 5,
            Denomination::R5 => 6,
            Denomination::R2 => 7,
            Denomination::R1 => 8,
        }
    }

    /// Wire key used by the drawer snapshot and submission payloads
    pub fn key(self) -> &'static str {
        match self {
            Denomination::R500 => "r500",
            Denomination::R200 => "r200",
            Denomination::R100 => "r100",
            Denomination::R50 => "r50",
            Denomination::R20 => "r20",
            Denomination::R10 => "r10",
            Denomination::R5 => "r5",
            Denomination::R2 => "r2",
            Denomination::R1 => "r1",
        }
    }

    pub fn from_value(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.value() == value)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.key() == key)
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Which movement column of the ledger an operator is typing into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountField {
    Collect,
    Issue,
}

/// A note count per denomination, always holding all nine entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenominationCounts([u32; 9]);

impl DenominationCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts given in descending denomination order
    pub fn from_array(counts: [u32; 9]) -> Self {
        Self(counts)
    }

    pub fn to_array(&self) -> [u32; 9] {
        self.0
    }

    pub fn get(&self, denomination: Denomination) -> u32 {
        self.0[denomination.index()]
    }

    pub fn set(&mut self, denomination: Denomination, count: u32) {
        self.0[denomination.index()] = count;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Denomination, u32)> + '_ {
        Denomination::ALL.into_iter().map(move |d| (d, self.get(d)))
    }

    /// Monetary value of all notes
    pub fn total_value(&self) -> u64 {
        self.iter()
            .map(|(d, count)| u64::from(d.value()) * u64::from(count))
            .sum()
    }

    /// Number of physical notes
    pub fn note_count(&self) -> u64 {
        self.0.iter().map(|&count| u64::from(count)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&count| count == 0)
    }
}

impl FromIterator<(Denomination, u32)> for DenominationCounts {
    fn from_iter<I: IntoIterator<Item = (Denomination, u32)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (denomination, count) in iter {
            counts.set(denomination, count);
        }
        counts
    }
}

impl From<&BTreeMap<Denomination, u32>> for DenominationCounts {
    fn from(map: &BTreeMap<Denomination, u32>) -> Self {
        map.iter().map(|(&d, &count)| (d, count)).collect()
    }
}
