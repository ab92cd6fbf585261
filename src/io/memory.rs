//! An in-memory [`MetadataFacade`] for fixtures, replayed captures and tests.
//!
//! With the `serde` feature a [`MemoryRawFile`] can be loaded from a JSON document
//! describing every scan. Spectrum averaging is not computed here. Averaged
//! results are recorded up front for the scan selection and filter that will
//! request them.
use std::io;

use crate::io::averaging::ScanFilterTemplate;
use crate::io::traits::{
    AcquisitionSummary, Device, InstrumentSelection, MetadataFacade, RawFileError, ScanSelection,
};
use crate::mass_error::MassOptions;
use crate::spectrum::{
    AveragedScan, CentroidStream, Chromatogram, ChromatogramTraceSettings, MSOrder, ScanEvent,
    ScanStatistics, SegmentedScan, TraceType, Trailer,
};

#[cfg(feature = "serde")]
use crate::io::traits::OpenRawFile;

/// Everything the facade knows about one scan
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MemoryScan {
    pub retention_time: f64,
    pub event: ScanEvent,
    pub statistics: ScanStatistics,
    pub segmented: SegmentedScan,
    pub centroids: Option<CentroidStream>,
    /// What the vendor peak picker would make of a profile scan
    pub centroided_profile: Option<SegmentedScan>,
    pub trailer: Trailer,
}

impl MemoryScan {
    pub fn new(retention_time: f64, event: ScanEvent) -> Self {
        Self {
            retention_time,
            event,
            ..Default::default()
        }
    }

    pub fn with_segmented(mut self, positions: Vec<f64>, intensities: Vec<f64>) -> Self {
        self.segmented = SegmentedScan::new(positions, intensities);
        self
    }

    pub fn with_centroids(mut self, stream: CentroidStream) -> Self {
        self.statistics.has_centroid_stream = true;
        self.centroids = Some(stream);
        self
    }

    pub fn with_trailer(mut self, trailer: Trailer) -> Self {
        self.trailer = trailer;
        self
    }

    fn preferred_signal(&self) -> (&[f64], &[f64]) {
        match &self.centroids {
            Some(c) => (&c.masses, &c.intensities),
            None => (&self.segmented.positions, &self.segmented.intensities),
        }
    }
}

/// A pre-computed averaging result and the request it answers
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordedAverage {
    pub selection: ScanSelection,
    pub filter: Option<String>,
    pub result: AveragedScan,
}

/// A raw acquisition held entirely in memory. Scans are numbered consecutively
/// from `first_scan` in the order they were added.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryRawFile {
    pub first_scan: u32,
    /// Defaults to the last scan's retention time
    #[cfg_attr(feature = "serde", serde(default))]
    pub total_time: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    scans: Vec<MemoryScan>,
    #[cfg_attr(feature = "serde", serde(default))]
    averages: Vec<RecordedAverage>,
    #[cfg_attr(feature = "serde", serde(skip))]
    selection: InstrumentSelection,
    #[cfg_attr(feature = "serde", serde(skip))]
    closed: bool,
}

impl Default for MemoryRawFile {
    fn default() -> Self {
        Self::new(1)
    }
}

impl MemoryRawFile {
    pub fn new(first_scan: u32) -> Self {
        Self {
            first_scan,
            total_time: None,
            scans: Vec::new(),
            averages: Vec::new(),
            selection: InstrumentSelection::default(),
            closed: false,
        }
    }

    pub fn with_total_time(mut self, total_time: f64) -> Self {
        self.total_time = Some(total_time);
        self
    }

    /// Append a scan, returning the scan number it was assigned
    pub fn push_scan(&mut self, scan: MemoryScan) -> u32 {
        self.scans.push(scan);
        self.first_scan + self.scans.len() as u32 - 1
    }

    pub fn record_average(
        &mut self,
        selection: ScanSelection,
        filter: Option<String>,
        result: AveragedScan,
    ) {
        self.averages.push(RecordedAverage {
            selection,
            filter,
            result,
        });
    }

    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self) -> Result<(), RawFileError> {
        if self.closed {
            Err(RawFileError::IOError(io::Error::new(
                io::ErrorKind::NotConnected,
                "the raw file has been closed",
            )))
        } else {
            Ok(())
        }
    }

    fn last_scan(&self) -> u32 {
        (self.first_scan + self.scans.len() as u32).saturating_sub(1)
    }

    pub fn scan(&self, scan_number: u32) -> Result<&MemoryScan, RawFileError> {
        self.check_open()?;
        scan_number
            .checked_sub(self.first_scan)
            .and_then(|i| self.scans.get(i as usize))
            .ok_or(RawFileError::ScanOutOfRange {
                scan_number,
                first: self.first_scan,
                last: self.last_scan(),
            })
    }

    fn numbered_scans(&self) -> impl Iterator<Item = (u32, &MemoryScan)> {
        self.scans
            .iter()
            .enumerate()
            .map(|(i, s)| (self.first_scan + i as u32, s))
    }
}

/// Parse a chromatogram scan filter. `"ms"` selects MS1, `"msN"` MSn and an
/// empty filter every scan.
fn parse_order_filter(filter: &str) -> Result<Option<MSOrder>, RawFileError> {
    let filter = filter.trim().to_lowercase();
    if filter.is_empty() {
        return Ok(None);
    }
    let rest = filter
        .strip_prefix("ms")
        .ok_or_else(|| RawFileError::FilterParse(filter.clone()))?;
    let level = if rest.is_empty() {
        1
    } else {
        rest.parse::<u8>()
            .map_err(|_| RawFileError::FilterParse(filter.clone()))?
    };
    MSOrder::from_level(level)
        .map(Some)
        .ok_or(RawFileError::FilterParse(filter))
}

impl MetadataFacade for MemoryRawFile {
    fn select_instrument(&mut self, selection: InstrumentSelection) -> Result<(), RawFileError> {
        self.check_open()?;
        if selection.device != Device::MS || selection.number != 1 {
            return Err(RawFileError::Unsupported(format!(
                "only MS device 1 is available, {selection:?} was requested"
            )));
        }
        self.selection = selection;
        Ok(())
    }

    fn summary(&self) -> Result<AcquisitionSummary, RawFileError> {
        self.check_open()?;
        let total_time = self
            .total_time
            .or_else(|| self.scans.last().map(|s| s.retention_time))
            .unwrap_or_default();
        Ok(AcquisitionSummary {
            scan_count: self.scans.len() as u32,
            first_scan: self.first_scan,
            last_scan: self.last_scan(),
            total_time,
        })
    }

    fn retention_time_of(&self, scan_number: u32) -> Result<f64, RawFileError> {
        Ok(self.scan(scan_number)?.retention_time)
    }

    fn scan_event_of(&self, scan_number: u32) -> Result<ScanEvent, RawFileError> {
        Ok(self.scan(scan_number)?.event.clone())
    }

    fn scan_statistics_of(&self, scan_number: u32) -> Result<ScanStatistics, RawFileError> {
        let scan = self.scan(scan_number)?;
        let mut stats = scan.statistics;
        stats.has_centroid_stream = scan.centroids.is_some();
        Ok(stats)
    }

    fn centroid_stream_of(&self, scan_number: u32) -> Result<CentroidStream, RawFileError> {
        Ok(self.scan(scan_number)?.centroids.clone().unwrap_or_default())
    }

    fn segmented_scan_of(&self, scan_number: u32) -> Result<SegmentedScan, RawFileError> {
        Ok(self.scan(scan_number)?.segmented.clone())
    }

    fn centroided_profile_of(&self, scan_number: u32) -> Result<SegmentedScan, RawFileError> {
        let scan = self.scan(scan_number)?;
        Ok(scan
            .centroided_profile
            .clone()
            .unwrap_or_else(|| scan.segmented.clone()))
    }

    fn trailer_of(&self, scan_number: u32) -> Result<Trailer, RawFileError> {
        Ok(self.scan(scan_number)?.trailer.clone())
    }

    fn average(
        &self,
        selection: &ScanSelection,
        filter: Option<&str>,
        _options: &MassOptions,
    ) -> Result<AveragedScan, RawFileError> {
        self.check_open()?;
        if let Some(filter) = filter {
            ScanFilterTemplate::parse(filter)?;
        }
        match selection {
            ScanSelection::Range(start, end) => {
                self.scan(*start)?;
                self.scan(*end)?;
            }
            ScanSelection::List(scans) => {
                for s in scans {
                    self.scan(*s)?;
                }
            }
        }
        self.averages
            .iter()
            .find(|rec| &rec.selection == selection && rec.filter.as_deref() == filter)
            .map(|rec| rec.result.clone())
            .ok_or_else(|| {
                RawFileError::Unsupported(format!(
                    "no averaged spectrum was recorded for {selection:?} with filter {filter:?}"
                ))
            })
    }

    fn chromatogram(
        &self,
        settings: &ChromatogramTraceSettings,
        options: Option<&MassOptions>,
    ) -> Result<Chromatogram, RawFileError> {
        self.check_open()?;
        let order = parse_order_filter(&settings.filter)?;
        let ranges: Vec<_> = settings
            .mass_ranges
            .iter()
            .map(|r| match options {
                Some(opts) => r.widen(opts),
                None => *r,
            })
            .collect();

        let mut chrom = Chromatogram::default();
        for (_, scan) in self
            .numbered_scans()
            .filter(|(_, s)| order.map_or(true, |o| s.event.ms_order == o))
        {
            let (masses, intensities) = scan.preferred_signal();
            let value = match settings.trace_type {
                TraceType::TIC => intensities.iter().sum(),
                TraceType::BasePeak => intensities.iter().copied().fold(0.0, f64::max),
                TraceType::MassRange => masses
                    .iter()
                    .zip(intensities)
                    .filter(|(m, _)| ranges.iter().any(|r| r.contains(**m)))
                    .map(|(_, i)| *i)
                    .sum(),
            };
            chrom.push(scan.retention_time, value);
        }
        Ok(chrom)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(feature = "serde")]
impl OpenRawFile for MemoryRawFile {
    fn open_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, RawFileError> {
        let path = path.as_ref();
        let handle = std::fs::File::open(path).map_err(|e| RawFileError::FileNotOpenable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_reader(io::BufReader::new(handle)).map_err(|e| {
            RawFileError::FileNotOpenable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::spectrum::MassRange;

    fn make_file() -> MemoryRawFile {
        let mut file = MemoryRawFile::new(1);
        file.push_scan(
            MemoryScan::new(
                0.1,
                ScanEvent {
                    ms_order: MSOrder::MS1,
                    filter_text: "FTMS + p ESI Full ms [300.0000-1500.0000]".into(),
                    ..Default::default()
                },
            )
            .with_segmented(vec![400.0, 500.0, 600.0], vec![10.0, 30.0, 20.0]),
        );
        file.push_scan(
            MemoryScan::new(
                0.2,
                ScanEvent {
                    ms_order: MSOrder::MS2,
                    filter_text: "FTMS + p ESI d Full ms2 500.0000@hcd30.00 [100.0000-1000.0000]"
                        .into(),
                    ..Default::default()
                },
            )
            .with_segmented(vec![200.0, 300.0], vec![5.0, 6.0]),
        );
        file
    }

    #[test]
    fn test_summary_and_bounds() {
        let file = make_file();
        let summary = file.summary().unwrap();
        assert_eq!(summary.scan_count, 2);
        assert_eq!(summary.first_scan, 1);
        assert_eq!(summary.last_scan, 2);
        assert_eq!(summary.total_time, 0.2);
        assert!(file.retention_time_of(3).unwrap_err().is_out_of_range());
        assert!(file.retention_time_of(0).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_chromatogram() {
        let file = make_file();
        let tic = file
            .chromatogram(&ChromatogramTraceSettings::new(TraceType::TIC, "ms"), None)
            .unwrap();
        assert_eq!(tic.times, vec![0.1]);
        assert_eq!(tic.intensities, vec![60.0]);

        let mut settings = ChromatogramTraceSettings::new(TraceType::MassRange, "ms");
        settings.mass_ranges.push(MassRange::new(500.0, 500.0));
        let xic = file
            .chromatogram(&settings, Some(&MassOptions::default()))
            .unwrap();
        assert_eq!(xic.intensities, vec![30.0]);

        let bp = file
            .chromatogram(&ChromatogramTraceSettings::new(TraceType::BasePeak, ""), None)
            .unwrap();
        assert_eq!(bp.intensities, vec![30.0, 6.0]);

        assert!(matches!(
            file.chromatogram(&ChromatogramTraceSettings::new(TraceType::TIC, "sim"), None),
            Err(RawFileError::FilterParse(_))
        ));
    }

    #[test]
    fn test_close() {
        let mut file = make_file();
        file.close();
        assert!(file.summary().is_err());
        assert!(file.scan_event_of(1).is_err());
    }
}
