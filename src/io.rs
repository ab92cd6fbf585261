pub mod averaging;
pub mod cache;
pub mod memory;
pub mod mgf;
pub mod raw_file;
pub mod scan_index;
pub mod traits;

pub(crate) mod compression;

pub use crate::io::averaging::{average_scan_list, average_scan_range, ScanFilterTemplate};
pub use crate::io::cache::{CachePolicy, SpectrumCache};
pub use crate::io::memory::{MemoryRawFile, MemoryScan, RecordedAverage};
pub use crate::io::mgf::{
    calculate_selected_ion_mz, ExportConfig, ExportError, ExportSession, ExportSummary,
    MGFExporter, MGFWriter, MgfSpectrum, PeakSource,
};
pub use crate::io::raw_file::{RawFile, TimedScan};
pub use crate::io::scan_index::{PrecursorMassTable, ScanIndex, ScanRecord, ScanSubset, TimeSeries};
pub use crate::io::traits::{
    AcquisitionSummary, Device, InstrumentSelection, MetadataFacade, OpenRawFile, RawFileError,
    ScanSelection,
};
