//! A single forward pass over an acquisition that writes its MSn scans as MGF.
use std::io;

use indexmap::IndexMap;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use thiserror::Error;

use crate::io::traits::{InstrumentSelection, MetadataFacade, RawFileError};
use crate::spectrum::{MSOrder, MSOrderSet, Reaction, ScanDataType, ScanEvent};

use super::writer::{MGFWriter, MgfSpectrum};

/// Trailer label holding the precursor charge
pub const CHARGE_STATE_LABEL: &str = "Charge State:";
/// Trailer label holding the instrument's monoisotopic precursor m/z
pub const MONOISOTOPIC_MZ_LABEL: &str = "Monoisotopic M/Z:";

const ZERO_DELTA: f64 = 0.0001;
const PRECURSOR_MZ_DELTA: f64 = 0.0001;
const DEFAULT_ISOLATION_WINDOW_LOWER_OFFSET: f64 = 1.5;
const DEFAULT_ISOLATION_WINDOW_UPPER_OFFSET: f64 = 2.5;
const PROGRESS_STEP: u32 = 10;

/// The trailer label holding the isolation width used for an MS level
pub fn isolation_width_label(ms_level: u8) -> String {
    format!("MS{ms_level} Isolation Width:")
}

// The isolation token of an MS2 filter, the text between "ms2 " and the activation "@"
lazy_static! {
    static ref ISOLATION_MZ_PATTERN: Regex = Regex::new(r"ms2 (.*?)@").unwrap();
}

/**
Choose the precursor m/z to report for a reaction.

The instrument's monoisotopic m/z is preferred when it is present, non-zero and
differs from the reaction's precursor mass. It is only accepted if it falls
inside the isolation window, otherwise the precursor mass is reported.

When the trailer has no usable isolation width the reaction's own is used.
Windows with a half-width of at most 2 are checked against the fixed range
`[precursor - 3.0, precursor + 2.5]` rather than the half-width.
*/
pub fn calculate_selected_ion_mz(
    reaction: &Reaction,
    monoisotopic_mz: Option<f64>,
    isolation_width: Option<f64>,
) -> f64 {
    let precursor = reaction.precursor_mass;
    let isolation_width = match isolation_width {
        Some(w) if !(w < ZERO_DELTA) => w,
        _ => reaction.isolation_width,
    };
    let half_width = isolation_width * 0.5;

    let mono = match monoisotopic_mz {
        Some(mono) if mono > ZERO_DELTA && (precursor - mono).abs() > PRECURSOR_MZ_DELTA => mono,
        _ => return precursor,
    };

    let (low, high) = if half_width <= 2.0 {
        (
            precursor - DEFAULT_ISOLATION_WINDOW_LOWER_OFFSET * 2.0,
            precursor + DEFAULT_ISOLATION_WINDOW_UPPER_OFFSET,
        )
    } else {
        (precursor - half_width, precursor + half_width)
    };
    if mono < low || mono > high {
        precursor
    } else {
        mono
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    /// An MS3 scan whose filter names no MS2 isolation m/z seen so far
    #[error("Couldn't find an MS2 precursor scan for MS3 scan {0}")]
    PrecursorNotFound(u32),
    #[error("Failed to access the raw file: {0}")]
    Access(#[from] RawFileError),
    #[error("An IO error occurred while writing: {0}")]
    IOError(#[from] io::Error),
}

impl From<ExportError> for io::Error {
    fn from(value: ExportError) -> Self {
        match value {
            ExportError::PrecursorNotFound(_) => {
                io::Error::new(io::ErrorKind::NotFound, value.to_string())
            }
            ExportError::Access(e) => e.into(),
            ExportError::IOError(e) => e,
        }
    }
}

/// Where the exported peak list is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PeakSource {
    /// The segmented scan as stored
    #[default]
    Segmented,
    /// The centroid stream if there is one, else the vendor centroided profile
    /// for profile scans, else the segmented scan
    PreferCentroid,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExportConfig {
    /// The MS orders that get a spectrum block
    pub ms_orders: MSOrderSet,
    pub peak_source: PeakSource,
    /// Write `PRECURSORSCAN=` lines
    pub include_precursor_reference: bool,
    /// Write `END IONS` after blocks without peaks
    pub terminate_empty_spectra: bool,
    pub device: InstrumentSelection,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ms_orders: MSOrderSet::MS2,
            peak_source: PeakSource::default(),
            include_precursor_reference: false,
            terminate_empty_spectra: false,
            device: InstrumentSelection::default(),
        }
    }
}

impl ExportConfig {
    pub fn with_ms_orders(mut self, ms_orders: MSOrderSet) -> Self {
        self.ms_orders = ms_orders;
        self
    }

    pub fn with_peak_source(mut self, peak_source: PeakSource) -> Self {
        self.peak_source = peak_source;
        self
    }

    pub fn with_precursor_reference(mut self, value: bool) -> Self {
        self.include_precursor_reference = value;
        self
    }

    pub fn with_terminate_empty_spectra(mut self, value: bool) -> Self {
        self.terminate_empty_spectra = value;
        self
    }

    pub fn with_device(mut self, device: InstrumentSelection) -> Self {
        self.device = device;
        self
    }
}

/// Counts gathered over one export run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportSummary {
    pub scans_visited: u32,
    pub spectra_written: u32,
    pub scans_skipped: u32,
}

/// The precursor tracking state of one export run.
///
/// Scans must be visited in increasing scan number order.
#[derive(Debug, Clone, Default)]
pub struct ExportSession {
    selection: InstrumentSelection,
    precursor_scan_number: Option<u32>,
    isolation_token_to_ms2_scan: IndexMap<String, u32>,
    last_progress: u32,
}

impl ExportSession {
    pub fn new(selection: InstrumentSelection) -> Self {
        Self {
            selection,
            ..Default::default()
        }
    }

    /// The most recently visited MS1 scan
    pub fn precursor_scan_number(&self) -> Option<u32> {
        self.precursor_scan_number
    }

    /// Isolation m/z tokens and the MS2 scan that last used them, oldest first
    pub fn isolation_table(&self) -> &IndexMap<String, u32> {
        &self.isolation_token_to_ms2_scan
    }

    /// Update the tracking state with a scan and resolve the title of the scan
    /// it was derived from.
    ///
    /// MS1 scans are always noted. Other scans only change state when `exported`
    /// is set. MS2 scans refer to the last MS1 scan and record their isolation
    /// m/z token. MS3 scans refer to the first recorded MS2 scan whose token
    /// appears in their filter text.
    pub fn visit(
        &mut self,
        scan_number: u32,
        event: &ScanEvent,
        exported: bool,
    ) -> Result<Option<String>, ExportError> {
        match event.ms_order {
            MSOrder::MS1 => {
                self.precursor_scan_number = Some(scan_number);
                Ok(None)
            }
            _ if !exported => Ok(None),
            MSOrder::MS2 => {
                if let Some(token) = ISOLATION_MZ_PATTERN
                    .captures(&event.filter_text)
                    .and_then(|caps| caps.get(1))
                {
                    let token = token.as_str().to_string();
                    self.isolation_token_to_ms2_scan.shift_remove(&token);
                    self.isolation_token_to_ms2_scan.insert(token, scan_number);
                } else {
                    debug!("No isolation m/z found in the filter of scan {scan_number}");
                }
                Ok(self
                    .precursor_scan_number
                    .map(|n| self.selection.native_id(n)))
            }
            MSOrder::MS3 => self
                .isolation_token_to_ms2_scan
                .iter()
                .find(|(token, _)| event.filter_text.contains(token.as_str()))
                .map(|(_, ms2_scan)| Some(self.selection.native_id(*ms2_scan)))
                .ok_or(ExportError::PrecursorNotFound(scan_number)),
            _ => Ok(None),
        }
    }

    /// Log the share of scans visited each time it crosses a multiple of ten percent
    pub fn report_progress(&mut self, scan_number: u32, scan_count: u32) {
        if scan_count == 0 {
            return;
        }
        let progress = (scan_number as f64 / scan_count as f64 * 100.0) as u32;
        if progress % PROGRESS_STEP == 0 && progress != self.last_progress {
            info!("{progress} %");
            self.last_progress = progress;
        }
    }
}

/// Writes the scans of an acquisition to an [`MGFWriter`] according to an [`ExportConfig`]
#[derive(Debug, Clone, Default)]
pub struct MGFExporter {
    config: ExportConfig,
}

impl MGFExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Visit every scan once, in order. Failures confined to one scan are logged
    /// and that scan is skipped. Write failures end the export.
    pub fn export<F: MetadataFacade + ?Sized, W: io::Write>(
        &self,
        facade: &mut F,
        writer: &mut MGFWriter<W>,
    ) -> Result<ExportSummary, ExportError> {
        facade.select_instrument(self.config.device)?;
        let acquisition = facade.summary()?;
        writer.set_terminate_empty_spectra(self.config.terminate_empty_spectra);

        let mut session = ExportSession::new(self.config.device);
        let mut summary = ExportSummary::default();
        if acquisition.scan_count > 0 {
            for scan_number in acquisition.scan_numbers() {
                session.report_progress(scan_number, acquisition.scan_count);
                summary.scans_visited += 1;
                match self.process_scan(&*facade, &mut session, scan_number) {
                    Ok(Some(spectrum)) => {
                        writer.write(&spectrum)?;
                        summary.spectra_written += 1;
                    }
                    Ok(None) => {}
                    Err(ExportError::IOError(e)) => return Err(ExportError::IOError(e)),
                    Err(e) => {
                        warn!("Skipping scan {scan_number}: {e}");
                        summary.scans_skipped += 1;
                    }
                }
            }
        }
        writer.flush()?;
        info!(
            "Exported {} spectra from {} scans, {} skipped",
            summary.spectra_written, summary.scans_visited, summary.scans_skipped
        );
        Ok(summary)
    }

    /// Build the block for one scan, or `None` if its MS order isn't exported
    pub fn process_scan<F: MetadataFacade + ?Sized>(
        &self,
        facade: &F,
        session: &mut ExportSession,
        scan_number: u32,
    ) -> Result<Option<MgfSpectrum>, ExportError> {
        let event = facade.scan_event_of(scan_number)?;
        let exported = self.config.ms_orders.contains_order(event.ms_order);
        let precursor_reference = session.visit(scan_number, &event, exported)?;
        if !exported {
            return Ok(None);
        }

        let retention_time = facade.retention_time_of(scan_number)?;
        let trailer = facade.trailer_of(scan_number)?;

        let charge = trailer
            .as_positive_int(CHARGE_STATE_LABEL)
            .filter(|z| *z > 0)
            .map(|z| (z, event.polarity));

        let precursor_mz = match event.reaction_for_order() {
            Some(reaction) => {
                let mono = trailer.as_f64(MONOISOTOPIC_MZ_LABEL);
                let width = event
                    .ms_order
                    .level()
                    .and_then(|level| trailer.as_f64(&isolation_width_label(level)));
                Some(calculate_selected_ion_mz(reaction, mono, width))
            }
            None => {
                debug!("No reaction found for scan {scan_number}");
                None
            }
        };

        let (masses, intensities) = self.read_peaks(facade, scan_number, &event)?;
        if masses.len() != intensities.len() {
            return Err(RawFileError::scan_read(
                scan_number,
                format!(
                    "{} masses but {} intensities",
                    masses.len(),
                    intensities.len()
                ),
            )
            .into());
        }

        Ok(Some(MgfSpectrum {
            title: self.config.device.native_id(scan_number),
            scan_number,
            retention_time,
            precursor_mz,
            charge,
            precursor_reference: precursor_reference
                .filter(|_| self.config.include_precursor_reference),
            masses,
            intensities,
        }))
    }

    fn read_peaks<F: MetadataFacade + ?Sized>(
        &self,
        facade: &F,
        scan_number: u32,
        event: &ScanEvent,
    ) -> Result<(Vec<f64>, Vec<f64>), RawFileError> {
        let scan = match self.config.peak_source {
            PeakSource::Segmented => facade.segmented_scan_of(scan_number)?,
            PeakSource::PreferCentroid => {
                let stats = facade.scan_statistics_of(scan_number)?;
                if stats.has_centroid_stream {
                    let stream = facade.centroid_stream_of(scan_number)?;
                    return Ok((stream.masses, stream.intensities));
                } else if event.scan_data == ScanDataType::Profile {
                    facade.centroided_profile_of(scan_number)?
                } else {
                    facade.segmented_scan_of(scan_number)?
                }
            }
        };
        Ok((scan.positions, scan.intensities))
    }
}
