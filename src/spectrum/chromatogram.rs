use crate::mass_error::MassOptions;

/// The kind of chromatogram trace to extract from MS scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TraceType {
    /// Extracted ion current over one or more mass ranges
    #[default]
    MassRange,
    /// Total ion current
    TIC,
    /// Most intense peak per scan
    BasePeak,
}

/// A closed `[low, high]` mass interval
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MassRange {
    pub low: f64,
    pub high: f64,
}

impl MassRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Widen the range by a mass tolerance on both ends
    pub fn widen(&self, options: &MassOptions) -> Self {
        Self {
            low: options.lower_bound(self.low),
            high: options.upper_bound(self.high),
        }
    }

    pub fn contains(&self, mass: f64) -> bool {
        self.low <= mass && mass <= self.high
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChromatogramTraceSettings {
    pub trace_type: TraceType,
    /// A scan filter selecting the scans to include, e.g. `"ms"` or `"ms2"`
    pub filter: String,
    pub mass_ranges: Vec<MassRange>,
}

impl ChromatogramTraceSettings {
    pub fn new(trace_type: TraceType, filter: impl Into<String>) -> Self {
        Self {
            trace_type,
            filter: filter.into(),
            mass_ranges: Vec::new(),
        }
    }
}

/// A chromatogram trace as parallel time (minutes) and intensity arrays
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chromatogram {
    pub times: Vec<f64>,
    pub intensities: Vec<f64>,
}

impl Chromatogram {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn push(&mut self, time: f64, intensity: f64) {
        self.times.push(time);
        self.intensities.push(intensity);
    }
}
