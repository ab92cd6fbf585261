//! Mass tolerance units and the options bundle handed to the vendor library when it
//! compares masses, e.g. while averaging scans or extracting mass range chromatograms.

/// The units a mass tolerance may be expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ToleranceUnits {
    /// Milli mass units, 1/1000th of a Dalton
    MMU,
    /// Parts per million of the query mass
    #[default]
    PPM,
    /// Atomic mass units (Daltons)
    AMU,
}

impl ToleranceUnits {
    /// Convert `tolerance` in these units into an absolute width in Daltons around `query`
    pub fn absolute_width(&self, query: f64, tolerance: f64) -> f64 {
        match self {
            Self::MMU => tolerance / 1000.0,
            Self::PPM => query * tolerance / 1e6,
            Self::AMU => tolerance,
        }
    }

    pub fn lower_bound(&self, query: f64, tolerance: f64) -> f64 {
        query - self.absolute_width(query, tolerance)
    }

    pub fn upper_bound(&self, query: f64, tolerance: f64) -> f64 {
        query + self.absolute_width(query, tolerance)
    }

    /// Test whether `alt` falls within `tolerance` of `query`, bounds inclusive
    pub fn contains(&self, query: f64, alt: f64, tolerance: f64) -> bool {
        (query - alt).abs() <= self.absolute_width(query, tolerance)
    }

    /// The short name the vendor library displays for these units
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MMU => "mmu",
            Self::PPM => "ppm",
            Self::AMU => "amu",
        }
    }
}

/// Mass comparison options: a tolerance, its units and the number of decimal
/// places masses are reported with.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MassOptions {
    pub tolerance: f64,
    pub tolerance_units: ToleranceUnits,
    pub precision: u8,
}

impl Default for MassOptions {
    fn default() -> Self {
        Self {
            tolerance: 10.0,
            tolerance_units: ToleranceUnits::PPM,
            precision: 4,
        }
    }
}

impl MassOptions {
    pub fn new(tolerance: f64, tolerance_units: ToleranceUnits, precision: u8) -> Self {
        Self {
            tolerance,
            tolerance_units,
            precision,
        }
    }

    pub fn contains(&self, query: f64, alt: f64) -> bool {
        self.tolerance_units.contains(query, alt, self.tolerance)
    }

    pub fn lower_bound(&self, query: f64) -> f64 {
        self.tolerance_units.lower_bound(query, self.tolerance)
    }

    pub fn upper_bound(&self, query: f64) -> f64 {
        self.tolerance_units.upper_bound(query, self.tolerance)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bounds() {
        let query = 500.0;
        assert!((ToleranceUnits::PPM.absolute_width(query, 10.0) - 0.005).abs() < 1e-12);
        assert!((ToleranceUnits::MMU.lower_bound(query, 5.0) - 499.995).abs() < 1e-9);
        assert!((ToleranceUnits::AMU.upper_bound(query, 0.5) - 500.5).abs() < 1e-12);

        let opts = MassOptions::new(20.0, ToleranceUnits::PPM, 4);
        assert!(opts.contains(query, 500.009));
        assert!(!opts.contains(query, 500.011));
    }
}
