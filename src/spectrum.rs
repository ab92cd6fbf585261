//! The scan-level data model exchanged with a [`MetadataFacade`](crate::io::MetadataFacade).
pub mod chromatogram;
pub mod peaks;
pub mod scan_properties;
pub mod trailer;

pub use crate::spectrum::chromatogram::{
    Chromatogram, ChromatogramTraceSettings, MassRange, TraceType,
};
pub use crate::spectrum::peaks::{
    AveragedScan, AveragedSpectrum, CentroidStream, ScanPeaks, SegmentedScan,
};
pub use crate::spectrum::scan_properties::*;
pub use crate::spectrum::trailer::Trailer;
