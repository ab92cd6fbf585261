//! `mzraw` provides scan-level access to instrument raw acquisitions through a
//! narrow [`MetadataFacade`] contract, with a retention time index, a scan
//! cache, averaging requests and MGF export on top.
//!
//! ```
//! use mzraw::prelude::*;
//! use mzraw::io::{MemoryRawFile, MemoryScan, RawFile};
//! use mzraw::spectrum::{MSOrder, ScanEvent};
//!
//! let mut file = MemoryRawFile::new(1);
//! file.push_scan(MemoryScan::new(0.5, ScanEvent { ms_order: MSOrder::MS1, ..Default::default() }));
//! let raw = RawFile::new(file).unwrap();
//! assert_eq!(raw.scan_number_from_retention_time(0.4).unwrap(), 1);
//! ```
pub mod io;
pub mod mass_error;
pub mod prelude;
pub mod spectrum;

pub use crate::mass_error::{MassOptions, ToleranceUnits};

pub use crate::io::mgf::{ExportConfig, MGFExporter, MGFWriter};
pub use crate::io::{MemoryRawFile, MetadataFacade, RawFile, RawFileError};

pub use crate::spectrum::{MSOrder, MSOrderSet, ScanEvent, ScanPeaks};
