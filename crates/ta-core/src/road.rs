//! Road classes and fixed per-class lookup tables.
//!
//! Every calibration parameter of the speed-flow and capacity models is keyed
//! by one of four road classes.  `RoadType` is a closed enum, so a lookup can
//! never miss once a symbol has been parsed; unknown symbols are rejected at
//! the parsing boundary with [`CoreError::UnknownRoadType`].

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::{CoreError, CoreResult};

// ── RoadType ──────────────────────────────────────────────────────────────────

/// Functional class of a road link.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum RoadType {
    /// Motorway (`"M"`).
    #[serde(rename = "M")]
    Motorway,
    /// Dual-carriageway A road (`"A_dual"`).
    #[serde(rename = "A_dual")]
    ADual,
    /// Single-carriageway A road (`"A_single"`).
    #[serde(rename = "A_single")]
    ASingle,
    /// Minor B road (`"B"`).  Speed does not respond to volume.
    #[serde(rename = "B")]
    BRoad,
}

impl RoadType {
    /// All road classes in table order.
    pub const ALL: [RoadType; 4] = [
        RoadType::Motorway,
        RoadType::ADual,
        RoadType::ASingle,
        RoadType::BRoad,
    ];

    /// Symbol used as key in calibration files.
    pub fn as_str(self) -> &'static str {
        match self {
            RoadType::Motorway => "M",
            RoadType::ADual    => "A_dual",
            RoadType::ASingle  => "A_single",
            RoadType::BRoad    => "B",
        }
    }

    #[inline]
    fn slot(self) -> usize {
        match self {
            RoadType::Motorway => 0,
            RoadType::ADual    => 1,
            RoadType::ASingle  => 2,
            RoadType::BRoad    => 3,
        }
    }

    /// Derive the class from an OS Open Roads style classification
    /// (`"Motorway"`, `"A Road"`, `"B Road"`) and form of way.
    ///
    /// A roads are dual carriageway unless the form of way mentions
    /// `"Single"`.
    pub fn classify(road_classification: &str, form_of_way: &str) -> CoreResult<RoadType> {
        match road_classification.trim().chars().next() {
            Some('M') => Ok(RoadType::Motorway),
            Some('A') if form_of_way.contains("Single") => Ok(RoadType::ASingle),
            Some('A') => Ok(RoadType::ADual),
            Some('B') => Ok(RoadType::BRoad),
            _ => Err(CoreError::UnknownRoadType(road_classification.to_owned())),
        }
    }
}

impl FromStr for RoadType {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<RoadType> {
        match s.trim() {
            "M" | "Motorway"              => Ok(RoadType::Motorway),
            "A_dual" | "A-dual" | "ADual" => Ok(RoadType::ADual),
            "A_single" | "A-single" | "ASingle" => Ok(RoadType::ASingle),
            "B" | "BRoad"                 => Ok(RoadType::BRoad),
            other => Err(CoreError::UnknownRoadType(other.to_owned())),
        }
    }
}

impl fmt::Display for RoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── RoadTable ─────────────────────────────────────────────────────────────────

/// One value per [`RoadType`], stored inline and indexed by the enum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoadTable<T> {
    values: [T; 4],
}

impl<T> RoadTable<T> {
    pub fn new(motorway: T, a_dual: T, a_single: T, b_road: T) -> Self {
        Self { values: [motorway, a_dual, a_single, b_road] }
    }

    pub fn from_fn(mut f: impl FnMut(RoadType) -> T) -> Self {
        Self {
            values: [
                f(RoadType::Motorway),
                f(RoadType::ADual),
                f(RoadType::ASingle),
                f(RoadType::BRoad),
            ],
        }
    }

    /// Iterate `(RoadType, &T)` in table order.
    pub fn iter(&self) -> impl Iterator<Item = (RoadType, &T)> {
        RoadType::ALL.into_iter().zip(self.values.iter())
    }
}

impl<T: Copy> RoadTable<T> {
    /// Build a table from `(symbol, value)` pairs, as found in a JSON map.
    ///
    /// Every symbol must parse as a [`RoadType`] and every class must be
    /// present; `table` names the table in the resulting error.
    pub fn from_symbols<I, S>(table: &'static str, entries: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
    {
        let mut slots: [Option<T>; 4] = [None; 4];
        for (symbol, value) in entries {
            let road_type: RoadType = symbol.as_ref().parse()?;
            slots[road_type.slot()] = Some(value);
        }
        let mut values = Vec::with_capacity(4);
        for road_type in RoadType::ALL {
            match slots[road_type.slot()] {
                Some(v) => values.push(v),
                None => return Err(CoreError::MissingCalibration { table, road_type }),
            }
        }
        Ok(Self { values: [values[0], values[1], values[2], values[3]] })
    }
}

impl<T> Index<RoadType> for RoadTable<T> {
    type Output = T;

    #[inline]
    fn index(&self, road_type: RoadType) -> &T {
        &self.values[road_type.slot()]
    }
}

impl<T> IndexMut<RoadType> for RoadTable<T> {
    #[inline]
    fn index_mut(&mut self, road_type: RoadType) -> &mut T {
        &mut self.values[road_type.slot()]
    }
}
