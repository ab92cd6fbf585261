use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::mass_error::MassOptions;
use crate::spectrum::{
    AveragedScan, CentroidStream, Chromatogram, ChromatogramTraceSettings, ScanEvent,
    ScanStatistics, SegmentedScan, Trailer,
};

/// The kind of data acquisition device to read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Device {
    None,
    #[default]
    MS,
    MSAnalog,
    Analog,
    UV,
    Pda,
    Other,
}

impl Device {
    /// The controller type number used in native scan identifiers
    pub fn controller_type(&self) -> i32 {
        match self {
            Self::None => -1,
            Self::MS => 0,
            Self::MSAnalog => 1,
            Self::Analog => 2,
            Self::UV => 3,
            Self::Pda => 4,
            Self::Other => 5,
        }
    }
}

/// Which of the acquisition's devices queries are directed to. Device numbers
/// are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstrumentSelection {
    pub device: Device,
    pub number: u32,
}

impl Default for InstrumentSelection {
    fn default() -> Self {
        Self {
            device: Device::MS,
            number: 1,
        }
    }
}

impl InstrumentSelection {
    pub fn new(device: Device, number: u32) -> Self {
        Self { device, number }
    }

    /// Format the native identifier of a scan on this device,
    /// `controllerType=<int> controllerNumber=<int> scan=<n>`
    pub fn native_id(&self, scan_number: u32) -> String {
        format!(
            "controllerType={} controllerNumber={} scan={}",
            self.device.controller_type(),
            self.number,
            scan_number
        )
    }
}

/// Run-level facts about the selected device's data
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AcquisitionSummary {
    pub scan_count: u32,
    pub first_scan: u32,
    pub last_scan: u32,
    /// The end of the acquisition in minutes
    pub total_time: f64,
}

impl AcquisitionSummary {
    pub fn contains_scan(&self, scan_number: u32) -> bool {
        self.first_scan <= scan_number && scan_number <= self.last_scan
    }

    pub fn scan_numbers(&self) -> std::ops::RangeInclusive<u32> {
        self.first_scan..=self.last_scan
    }
}

/// The scans to merge when averaging
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanSelection {
    /// An inclusive range of scan numbers
    Range(u32, u32),
    /// An explicit list of scan numbers
    List(Vec<u32>),
}

impl ScanSelection {
    pub fn first(&self) -> Option<u32> {
        match self {
            Self::Range(start, _) => Some(*start),
            Self::List(scans) => scans.first().copied(),
        }
    }

    pub fn contains(&self, scan_number: u32) -> bool {
        match self {
            Self::Range(start, end) => *start <= scan_number && scan_number <= *end,
            Self::List(scans) => scans.contains(&scan_number),
        }
    }
}

/// Errors that may occur when opening or querying a raw acquisition
#[derive(Debug, Error)]
pub enum RawFileError {
    /// The source could not be opened as a raw acquisition
    #[error("The raw file {path} could not be opened: {reason}")]
    FileNotOpenable { path: PathBuf, reason: String },
    /// A scan number outside of the acquisition's scan range
    #[error("The scan number {scan_number} is out of bounds. Valid range {first} - {last}")]
    ScanOutOfRange { scan_number: u32, first: u32, last: u32 },
    /// A retention time outside of `[0, total_time]`
    #[error("The retention time {time} is out of bounds. Valid range 0 - {total_time}")]
    TimeOutOfRange { time: f64, total_time: f64 },
    /// No MS2 scan's precursor was within the requested tolerance
    #[error("No MS2 scan has a precursor mass within {tolerance} of {precursor_mz}")]
    PrecursorMassNotFound { precursor_mz: f64, tolerance: f64 },
    /// The requested subset of scans is empty
    #[error("No {0} scans were found")]
    EmptySubset(&'static str),
    /// A scan filter could not be parsed
    #[error("Failed to parse scan filter {0:?}")]
    FilterParse(String),
    /// The scan exists but its data or metadata could not be decoded
    #[error("Failed to read scan {scan_number}: {reason}")]
    ScanRead { scan_number: u32, reason: String },
    /// The operation is not supported by this source
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("I/O error occurred while reading: {0}")]
    IOError(#[from] io::Error),
}

impl RawFileError {
    pub fn scan_read(scan_number: u32, reason: impl ToString) -> Self {
        Self::ScanRead {
            scan_number,
            reason: reason.to_string(),
        }
    }

    /// Whether this error is a bounds violation
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::ScanOutOfRange { .. } | Self::TimeOutOfRange { .. })
    }
}

impl From<RawFileError> for io::Error {
    fn from(value: RawFileError) -> Self {
        let s = value.to_string();
        match value {
            RawFileError::FileNotOpenable { .. } => io::Error::new(io::ErrorKind::InvalidData, s),
            RawFileError::ScanOutOfRange { .. }
            | RawFileError::TimeOutOfRange { .. }
            | RawFileError::FilterParse(_) => io::Error::new(io::ErrorKind::InvalidInput, s),
            RawFileError::PrecursorMassNotFound { .. } | RawFileError::EmptySubset(_) => {
                io::Error::new(io::ErrorKind::NotFound, s)
            }
            RawFileError::ScanRead { .. } => io::Error::new(io::ErrorKind::InvalidData, s),
            RawFileError::Unsupported(_) => io::Error::new(io::ErrorKind::Unsupported, s),
            RawFileError::IOError(e) => e,
        }
    }
}

/// The query contract a raw data access library has to fulfill.
///
/// Implementations wrap a single opened acquisition. Scan numbers are the
/// 1-based numbers the acquisition assigns, not offsets.
pub trait MetadataFacade {
    /// Direct all following queries to a particular device
    fn select_instrument(&mut self, selection: InstrumentSelection) -> Result<(), RawFileError>;

    /// Scan range and run length of the selected device
    fn summary(&self) -> Result<AcquisitionSummary, RawFileError>;

    /// The start time of a scan in minutes
    fn retention_time_of(&self, scan_number: u32) -> Result<f64, RawFileError>;

    fn scan_event_of(&self, scan_number: u32) -> Result<ScanEvent, RawFileError>;

    fn scan_statistics_of(&self, scan_number: u32) -> Result<ScanStatistics, RawFileError>;

    fn centroid_stream_of(&self, scan_number: u32) -> Result<CentroidStream, RawFileError>;

    fn segmented_scan_of(&self, scan_number: u32) -> Result<SegmentedScan, RawFileError>;

    /// Centroid a profile scan with the library's own peak picker
    fn centroided_profile_of(&self, scan_number: u32) -> Result<SegmentedScan, RawFileError>;

    fn trailer_of(&self, scan_number: u32) -> Result<Trailer, RawFileError>;

    /// Merge the selected scans into one spectrum. `filter` restricts which of the
    /// selected scans take part.
    fn average(
        &self,
        selection: &ScanSelection,
        filter: Option<&str>,
        options: &MassOptions,
    ) -> Result<AveragedScan, RawFileError>;

    fn chromatogram(
        &self,
        settings: &ChromatogramTraceSettings,
        options: Option<&MassOptions>,
    ) -> Result<Chromatogram, RawFileError>;

    /// Release the underlying handle
    fn close(&mut self) {}
}

/// A [`MetadataFacade`] that can be opened from a file path
pub trait OpenRawFile: MetadataFacade + Sized {
    fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, RawFileError>;
}
