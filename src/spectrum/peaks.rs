//! Peak array containers returned by a [`MetadataFacade`](crate::io::MetadataFacade)
//! and the decoded spectrum tuple served from the scan cache.

/// Peak-picked signal with per-peak charge assignments, as produced by
/// Fourier-transform analyzers
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CentroidStream {
    pub masses: Vec<f64>,
    pub intensities: Vec<f64>,
    pub charges: Vec<f64>,
}

impl CentroidStream {
    pub fn new(masses: Vec<f64>, intensities: Vec<f64>, charges: Vec<f64>) -> Self {
        Self {
            masses,
            intensities,
            charges,
        }
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }
}

/// The low resolution, possibly profile, signal of a scan
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentedScan {
    pub positions: Vec<f64>,
    pub intensities: Vec<f64>,
}

impl SegmentedScan {
    pub fn new(positions: Vec<f64>, intensities: Vec<f64>) -> Self {
        Self {
            positions,
            intensities,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn tic(&self) -> f64 {
        self.intensities.iter().sum()
    }
}

/// The decoded peaks of a single scan together with its scan event description.
///
/// `charges` is always the same length as `masses`. Signal without charge
/// information carries zeros.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanPeaks {
    pub masses: Vec<f64>,
    pub intensities: Vec<f64>,
    pub charges: Vec<f64>,
    pub description: String,
}

impl ScanPeaks {
    pub fn from_centroids(stream: CentroidStream, description: String) -> Self {
        Self {
            masses: stream.masses,
            intensities: stream.intensities,
            charges: stream.charges,
            description,
        }
    }

    pub fn from_segmented(scan: SegmentedScan, description: String) -> Self {
        let charges = vec![0.0; scan.positions.len()];
        Self {
            masses: scan.positions,
            intensities: scan.intensities,
            charges,
            description,
        }
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    /// Total ion current, the sum of all intensities
    pub fn tic(&self) -> f64 {
        self.intensities.iter().sum()
    }
}

/// The vendor library's merged scan. It always has a segmented component and
/// carries a centroid stream when the merged scans had one.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AveragedScan {
    pub segmented_scan: SegmentedScan,
    #[cfg_attr(feature = "serde", serde(default))]
    pub centroid_stream: Option<CentroidStream>,
}

impl AveragedScan {
    pub fn has_centroid_stream(&self) -> bool {
        self.centroid_stream.is_some()
    }

    pub fn preferred_masses(&self) -> &[f64] {
        match &self.centroid_stream {
            Some(stream) => &stream.masses,
            None => &self.segmented_scan.positions,
        }
    }

    pub fn preferred_intensities(&self) -> &[f64] {
        match &self.centroid_stream {
            Some(stream) => &stream.intensities,
            None => &self.segmented_scan.intensities,
        }
    }
}

/// The post-processed result of averaging several scans
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AveragedSpectrum {
    pub masses: Vec<f64>,
    pub intensities: Vec<f64>,
    pub charges: Vec<f64>,
}

impl From<AveragedScan> for AveragedSpectrum {
    fn from(value: AveragedScan) -> Self {
        let masses = value.preferred_masses().to_vec();
        let intensities = value.preferred_intensities().to_vec();
        let charges = match value.centroid_stream {
            Some(stream) => stream.charges,
            None => vec![0.0; masses.len()],
        };
        Self {
            masses,
            intensities,
            charges,
        }
    }
}
