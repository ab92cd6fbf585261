use std::fmt::Display;

use bitflags::bitflags;

/// The fragmentation depth of a scan, as reported by the scan event.
///
/// The neutral gain, neutral loss and parent scan modes are precursor-discovery
/// experiments rather than true MSn levels and have no [`MSOrder::level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MSOrder {
    NeutralGain,
    NeutralLoss,
    Parent,
    #[default]
    Any,
    MS1,
    MS2,
    MS3,
    MS4,
    MS5,
    MS6,
    MS7,
    MS8,
    MS9,
    MS10,
}

impl MSOrder {
    /// The numeric MS level, `None` for the scan modes which are not an MSn level
    pub fn level(&self) -> Option<u8> {
        match self {
            Self::MS1 => Some(1),
            Self::MS2 => Some(2),
            Self::MS3 => Some(3),
            Self::MS4 => Some(4),
            Self::MS5 => Some(5),
            Self::MS6 => Some(6),
            Self::MS7 => Some(7),
            Self::MS8 => Some(8),
            Self::MS9 => Some(9),
            Self::MS10 => Some(10),
            _ => None,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        let order = match level {
            1 => Self::MS1,
            2 => Self::MS2,
            3 => Self::MS3,
            4 => Self::MS4,
            5 => Self::MS5,
            6 => Self::MS6,
            7 => Self::MS7,
            8 => Self::MS8,
            9 => Self::MS9,
            10 => Self::MS10,
            _ => return None,
        };
        Some(order)
    }
}

impl Display for MSOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level() {
            Some(1) => f.write_str("ms"),
            Some(level) => write!(f, "ms{level}"),
            None => write!(f, "{self:?}"),
        }
    }
}

bitflags! {
    /// A set of MSn levels, used to choose which scans an export covers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct MSOrderSet: u16 {
        const MS1 = 1;
        const MS2 = 1 << 1;
        const MS3 = 1 << 2;
        const MS4 = 1 << 3;
        const MS5 = 1 << 4;
        const MS6 = 1 << 5;
        const MS7 = 1 << 6;
        const MS8 = 1 << 7;
        const MS9 = 1 << 8;
        const MS10 = 1 << 9;
    }
}

impl MSOrderSet {
    pub fn contains_order(&self, order: MSOrder) -> bool {
        match order.level() {
            Some(level) => self.contains(Self::from_bits_truncate(1 << (level - 1))),
            None => false,
        }
    }

    pub fn from_levels<I: IntoIterator<Item = u8>>(levels: I) -> Self {
        levels
            .into_iter()
            .filter(|level| (1..=10).contains(level))
            .fold(Self::empty(), |acc, level| {
                acc | Self::from_bits_truncate(1 << (level - 1))
            })
    }
}

impl Default for MSOrderSet {
    fn default() -> Self {
        Self::MS2
    }
}

impl From<MSOrder> for MSOrderSet {
    fn from(value: MSOrder) -> Self {
        value
            .level()
            .map(|level| Self::from_levels([level]))
            .unwrap_or_else(Self::empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Polarity {
    Negative,
    #[default]
    Positive,
    Any,
}

impl Polarity {
    /// The suffix appended to a charge state. Anything not explicitly positive
    /// is written as negative.
    pub fn sign(&self) -> char {
        match self {
            Self::Positive => '+',
            _ => '-',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MassAnalyzer {
    ITMS,
    TQMS,
    SQMS,
    TOFMS,
    /// Fourier-transform (Orbitrap/ICR) analyzers, which report centroid streams with charges
    FTMS,
    Sector,
    ASTMS,
    #[default]
    Any,
}

impl MassAnalyzer {
    pub fn is_fourier_transform(&self) -> bool {
        matches!(self, Self::FTMS)
    }
}

/// Whether the scan's signal was recorded as profile or centroid data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanDataType {
    Centroid,
    Profile,
    #[default]
    Any,
}

/// A precursor selection and activation step, one per fragmentation stage
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reaction {
    pub precursor_mass: f64,
    pub isolation_width: f64,
    pub collision_energy: f64,
}

impl Reaction {
    pub fn new(precursor_mass: f64, isolation_width: f64, collision_energy: f64) -> Self {
        Self {
            precursor_mass,
            isolation_width,
            collision_energy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Describes how a single scan was acquired, along with the human readable
/// filter text the vendor library renders for it.
pub struct ScanEvent {
    pub ms_order: MSOrder,
    pub polarity: Polarity,
    pub mass_analyzer: MassAnalyzer,
    pub scan_data: ScanDataType,
    #[cfg_attr(feature = "serde", serde(default))]
    pub reactions: Vec<Reaction>,
    pub filter_text: String,
}

impl ScanEvent {
    pub fn reaction_count(&self) -> usize {
        self.reactions.len()
    }

    pub fn get_reaction(&self, index: usize) -> Option<&Reaction> {
        self.reactions.get(index)
    }

    /// The reaction that produced a scan of this event's MS order, the `order - 2`th
    /// reaction. MS1 and non-MSn scans have none.
    pub fn reaction_for_order(&self) -> Option<&Reaction> {
        let level = self.ms_order.level()?;
        if level < 2 {
            return None;
        }
        self.get_reaction(level as usize - 2)
    }
}

impl Display for ScanEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.filter_text)
    }
}

/// Summary statistics about a scan's stored signal
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanStatistics {
    pub is_centroid: bool,
    pub packet_type: i32,
    pub has_centroid_stream: bool,
    pub tic: f64,
}
