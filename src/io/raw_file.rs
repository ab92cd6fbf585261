use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use crate::io::averaging;
use crate::io::cache::{CachePolicy, SpectrumCache};
use crate::io::mgf::{ExportConfig, ExportError, ExportSummary, MGFExporter, MGFWriter};
use crate::io::scan_index::{ScanIndex, ScanSubset};
use crate::io::traits::{
    AcquisitionSummary, InstrumentSelection, MetadataFacade, OpenRawFile, RawFileError,
};
use crate::mass_error::{MassOptions, ToleranceUnits};
use crate::spectrum::{
    AveragedSpectrum, Chromatogram, ChromatogramTraceSettings, MassRange, ScanPeaks, TraceType,
};

/// The default absolute tolerance (Da) used to match MS2 filter precursor masses
pub const DEFAULT_PRECURSOR_TOLERANCE: f64 = 10e-3;

/// The default averaging tolerance, in [`ToleranceUnits::PPM`]
pub const DEFAULT_AVERAGING_TOLERANCE: f64 = 10.0;

/// A peak list paired with the retention time of the scan it came from
pub type TimedScan = (Arc<ScanPeaks>, f64);

/**
An opened raw acquisition with its retention time index and scan cache.

The MS device #1 is selected when the wrapper is created and the [`ScanIndex`]
is built right away, so construction costs one pass over every scan. Scan
peaks requested through this type are memoized according to the configured
[`CachePolicy`].
*/
#[derive(Debug)]
pub struct RawFile<F: MetadataFacade> {
    path: Option<PathBuf>,
    facade: F,
    selection: InstrumentSelection,
    summary: AcquisitionSummary,
    index: ScanIndex,
    cache: SpectrumCache,
}

impl<F: MetadataFacade + OpenRawFile> RawFile<F> {
    /// Open the acquisition at `path` and index it
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, RawFileError> {
        let path = path.as_ref();
        let facade = F::open_path(path)?;
        let mut this = Self::new(facade)?;
        this.path = Some(path.to_path_buf());
        Ok(this)
    }
}

impl<F: MetadataFacade> RawFile<F> {
    pub fn new(facade: F) -> Result<Self, RawFileError> {
        Self::with_cache_policy(facade, CachePolicy::default())
    }

    pub fn with_cache_policy(mut facade: F, policy: CachePolicy) -> Result<Self, RawFileError> {
        let selection = InstrumentSelection::default();
        facade.select_instrument(selection)?;
        let summary = facade.summary()?;
        let index = ScanIndex::build(&facade, &summary)?;
        Ok(Self::from_parts(facade, selection, summary, index, policy))
    }

    fn from_parts(
        facade: F,
        selection: InstrumentSelection,
        summary: AcquisitionSummary,
        index: ScanIndex,
        policy: CachePolicy,
    ) -> Self {
        Self {
            path: None,
            facade,
            selection,
            summary,
            index,
            cache: SpectrumCache::new(policy),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn number_of_scans(&self) -> u32 {
        self.summary.scan_count
    }

    pub fn first_scan(&self) -> u32 {
        self.summary.first_scan
    }

    pub fn last_scan(&self) -> u32 {
        self.summary.last_scan
    }

    /// The length of the run in minutes
    pub fn total_time_min(&self) -> f64 {
        self.summary.total_time
    }

    /// The distinct MS2 precursor masses, ascending
    pub fn ms2_filter_masses(&self) -> &[f64] {
        self.index.ms2_filter_masses()
    }

    pub fn summary(&self) -> &AcquisitionSummary {
        &self.summary
    }

    pub fn index(&self) -> &ScanIndex {
        &self.index
    }

    pub fn cache(&self) -> &SpectrumCache {
        &self.cache
    }

    pub fn facade(&self) -> &F {
        &self.facade
    }

    fn check_scan_number(&self, scan_number: u32) -> Result<(), RawFileError> {
        if self.summary.contains_scan(scan_number) && self.summary.scan_count > 0 {
            Ok(())
        } else {
            Err(RawFileError::ScanOutOfRange {
                scan_number,
                first: self.summary.first_scan,
                last: self.summary.last_scan,
            })
        }
    }

    pub fn retention_time_from_scan_number(&self, scan_number: u32) -> Result<f64, RawFileError> {
        self.check_scan_number(scan_number)?;
        self.index.retention_time_of(scan_number)
    }

    /// The scan closest to `rt` minutes
    pub fn scan_number_from_retention_time(&self, rt: f64) -> Result<u32, RawFileError> {
        self.index
            .nearest_by_time(rt, ScanSubset::All)
            .map(|(scan_number, _)| scan_number)
    }

    pub fn ms1_scan_number_from_retention_time(
        &self,
        rt: f64,
    ) -> Result<(u32, f64), RawFileError> {
        self.index.nearest_by_time(rt, ScanSubset::MS1)
    }

    /// The MS2 scan closest to `rt` minutes, optionally restricted to those whose
    /// filter precursor mass is within [`DEFAULT_PRECURSOR_TOLERANCE`] of `precursor_mz`
    pub fn ms2_scan_number_from_retention_time(
        &self,
        rt: f64,
        precursor_mz: Option<f64>,
    ) -> Result<(u32, f64), RawFileError> {
        match precursor_mz {
            Some(mz) => self.ms2_scan_number_from_retention_time_and_mass(
                rt,
                mz,
                DEFAULT_PRECURSOR_TOLERANCE,
            ),
            None => self.index.nearest_by_time(rt, ScanSubset::MS2),
        }
    }

    pub fn ms2_scan_number_from_retention_time_and_mass(
        &self,
        rt: f64,
        precursor_mz: f64,
        tolerance: f64,
    ) -> Result<(u32, f64), RawFileError> {
        self.index
            .nearest_ms2_by_time_and_mass(rt, precursor_mz, tolerance)
    }

    /// Get the peaks and scan event description of a scan, decoding it only if
    /// the cache doesn't already hold it
    pub fn get_scan_from_scan_number(
        &mut self,
        scan_number: u32,
    ) -> Result<Arc<ScanPeaks>, RawFileError> {
        self.check_scan_number(scan_number)?;
        self.cache.get(&self.facade, scan_number)
    }

    /// Get the scan closest to `rt` minutes
    pub fn get_scan(&mut self, rt: f64) -> Result<Arc<ScanPeaks>, RawFileError> {
        let scan_number = self.scan_number_from_retention_time(rt)?;
        self.get_scan_from_scan_number(scan_number)
    }

    pub fn get_scan_ms1(&mut self, rt: f64) -> Result<TimedScan, RawFileError> {
        let (scan_number, found_rt) = self.ms1_scan_number_from_retention_time(rt)?;
        Ok((self.get_scan_from_scan_number(scan_number)?, found_rt))
    }

    pub fn get_scan_ms2(
        &mut self,
        rt: f64,
        precursor_mz: Option<f64>,
    ) -> Result<TimedScan, RawFileError> {
        let (scan_number, found_rt) = self.ms2_scan_number_from_retention_time(rt, precursor_mz)?;
        Ok((self.get_scan_from_scan_number(scan_number)?, found_rt))
    }

    pub fn scan_event_str_from_scan_number(
        &mut self,
        scan_number: u32,
    ) -> Result<String, RawFileError> {
        Ok(self
            .get_scan_from_scan_number(scan_number)?
            .description
            .clone())
    }

    /// Total ion current over the MS2 scans whose filter precursor mass is within
    /// `tolerance` Da of `precursor_mz`, in scan order
    pub fn tic_ms2(
        &mut self,
        precursor_mz: f64,
        tolerance: f64,
    ) -> Result<Chromatogram, RawFileError> {
        let scans: Vec<u32> = self
            .index
            .ms2_precursors()
            .scans_within(precursor_mz, tolerance)
            .collect();
        let mut trace = Chromatogram::default();
        for scan_number in scans {
            let time = self.index.retention_time_of(scan_number)?;
            let peaks = self.get_scan_from_scan_number(scan_number)?;
            trace.push(time, peaks.tic());
        }
        debug!(
            "Built an MS2 TIC over {} scans for precursor {precursor_mz}",
            trace.len()
        );
        Ok(trace)
    }

    /// Extract a chromatogram from the scans matching `filter` (`"ms"`, `"ms2"`, ...).
    /// `mz` and `tolerance` are only used by [`TraceType::MassRange`] traces.
    pub fn chromatogram(
        &self,
        mz: f64,
        tolerance: f64,
        trace_type: TraceType,
        units: ToleranceUnits,
        filter: &str,
    ) -> Result<Chromatogram, RawFileError> {
        let mut settings = ChromatogramTraceSettings::new(trace_type, filter);
        let options = if trace_type == TraceType::MassRange {
            settings.mass_ranges.push(MassRange::new(mz, mz));
            Some(MassOptions::new(tolerance, units, MassOptions::default().precision))
        } else {
            None
        };
        self.facade.chromatogram(&settings, options.as_ref())
    }

    /// Average the MS2 scans in `start_scan..=end_scan` sharing `precursor_mass`
    pub fn averaged_ms2_scans(
        &self,
        start_scan: u32,
        end_scan: u32,
        precursor_mass: f64,
        tolerance: f64,
        units: ToleranceUnits,
    ) -> Result<AveragedSpectrum, RawFileError> {
        self.check_scan_number(start_scan)?;
        self.check_scan_number(end_scan)?;
        averaging::average_scan_range(
            &self.facade,
            start_scan,
            end_scan,
            precursor_mass,
            tolerance,
            units,
        )
    }

    pub fn averaged_ms2_scans_from_list(
        &self,
        scans: &[u32],
        tolerance: f64,
        units: ToleranceUnits,
    ) -> Result<AveragedSpectrum, RawFileError> {
        for scan_number in scans {
            self.check_scan_number(*scan_number)?;
        }
        averaging::average_scan_list(&self.facade, scans, tolerance, units)
    }

    /// Average the MS2 scans between the ones closest to `rt_from` and `rt_to`
    pub fn average_ms2_scans_by_rt(
        &self,
        rt_from: f64,
        rt_to: f64,
        precursor_mass: f64,
        tolerance: f64,
        units: ToleranceUnits,
    ) -> Result<AveragedSpectrum, RawFileError> {
        let (start_scan, _) = self.index.nearest_by_time(rt_from, ScanSubset::MS2)?;
        let (end_scan, _) = self.index.nearest_by_time(rt_to, ScanSubset::MS2)?;
        self.averaged_ms2_scans(start_scan, end_scan, precursor_mass, tolerance, units)
    }

    /// Write every scan selected by `config` to `writer` as MGF.
    ///
    /// The export reads the facade directly and does not use the index or cache.
    pub fn export_mgf<W: io::Write>(
        &mut self,
        writer: &mut MGFWriter<W>,
        config: &ExportConfig,
    ) -> Result<ExportSummary, ExportError> {
        let exporter = MGFExporter::new(config.clone());
        let result = exporter.export(&mut self.facade, writer);
        if config.device != self.selection {
            if let Err(e) = self.facade.select_instrument(self.selection) {
                warn!("Failed to restore instrument selection {:?}: {e}", self.selection);
            }
        }
        result
    }

    /// Release the facade. The index and cache are discarded with it.
    pub fn close(mut self) {
        self.cache.clear();
        self.facade.close();
    }

    pub fn into_inner(self) -> F {
        self.facade
    }
}

#[cfg(feature = "parallelism")]
impl<F: MetadataFacade + Sync> RawFile<F> {
    /// Like [`RawFile::with_cache_policy`], classifying scans in parallel while
    /// building the index
    pub fn with_cache_policy_parallel(
        mut facade: F,
        policy: CachePolicy,
    ) -> Result<Self, RawFileError> {
        let selection = InstrumentSelection::default();
        facade.select_instrument(selection)?;
        let summary = facade.summary()?;
        let index = ScanIndex::build_parallel(&facade, &summary)?;
        Ok(Self::from_parts(facade, selection, summary, index, policy))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::memory::{MemoryRawFile, MemoryScan};
    use crate::spectrum::{
        AveragedScan, CentroidStream, MSOrder, MassAnalyzer, Reaction, ScanEvent, SegmentedScan,
    };
    use crate::io::traits::ScanSelection;

    fn ms1(rt: f64) -> MemoryScan {
        MemoryScan::new(
            rt,
            ScanEvent {
                ms_order: MSOrder::MS1,
                mass_analyzer: MassAnalyzer::FTMS,
                filter_text: "FTMS + p ESI Full ms [300.0000-1500.0000]".into(),
                ..Default::default()
            },
        )
        .with_centroids(CentroidStream::new(
            vec![400.0, 500.0],
            vec![100.0, 200.0],
            vec![2.0, 1.0],
        ))
    }

    fn ms2(rt: f64, precursor: f64) -> MemoryScan {
        MemoryScan::new(
            rt,
            ScanEvent {
                ms_order: MSOrder::MS2,
                mass_analyzer: MassAnalyzer::ITMS,
                reactions: vec![Reaction::new(precursor, 2.0, 30.0)],
                filter_text: format!("ITMS + c ESI d Full ms2 {precursor:.2}@cid35.00 [50.0000-1000.0000]"),
                ..Default::default()
            },
        )
        .with_segmented(vec![150.0, 250.0, 350.0], vec![1.0, 2.0, 3.0])
    }

    fn make_raw() -> RawFile<MemoryRawFile> {
        let mut file = MemoryRawFile::new(1).with_total_time(1.0);
        file.push_scan(ms1(0.0));
        file.push_scan(ms2(0.125, 325.0));
        file.push_scan(ms2(0.25, 410.5));
        file.push_scan(ms1(0.5));
        file.push_scan(ms2(0.625, 325.0));
        file.push_scan(ms2(0.75, 410.5));
        file.record_average(
            ScanSelection::Range(2, 5),
            Some("ITMS + c ESI d Full ms2 325.0000@cid35.00 [50.0000-1000.0000]".into()),
            AveragedScan {
                segmented_scan: SegmentedScan::new(vec![150.0, 250.0], vec![2.0, 4.0]),
                centroid_stream: None,
            },
        );
        RawFile::new(file).unwrap()
    }

    #[test_log::test]
    fn test_accessors() {
        let raw = make_raw();
        assert_eq!(raw.number_of_scans(), 6);
        assert_eq!(raw.first_scan(), 1);
        assert_eq!(raw.last_scan(), 6);
        assert_eq!(raw.total_time_min(), 1.0);
        assert_eq!(raw.ms2_filter_masses(), &[325.0, 410.5]);
        assert_eq!(raw.retention_time_from_scan_number(3).unwrap(), 0.25);
        assert!(raw.retention_time_from_scan_number(7).unwrap_err().is_out_of_range());
    }

    #[test_log::test]
    fn test_time_queries() {
        let raw = make_raw();
        assert_eq!(raw.scan_number_from_retention_time(0.13).unwrap(), 2);
        assert_eq!(raw.ms1_scan_number_from_retention_time(0.3).unwrap(), (4, 0.5));
        assert_eq!(
            raw.ms2_scan_number_from_retention_time(0.7, None).unwrap(),
            (6, 0.75)
        );
        assert_eq!(
            raw.ms2_scan_number_from_retention_time(0.7, Some(325.001)).unwrap(),
            (5, 0.625)
        );
        assert!(matches!(
            raw.ms2_scan_number_from_retention_time(0.7, Some(600.0)),
            Err(RawFileError::PrecursorMassNotFound { .. })
        ));
        assert!(raw.scan_number_from_retention_time(1.5).is_err());
    }

    #[test_log::test]
    fn test_get_scans() {
        let mut raw = make_raw();
        let peaks = raw.get_scan_from_scan_number(1).unwrap();
        assert_eq!(peaks.charges, vec![2.0, 1.0]);
        let peaks = raw.get_scan_from_scan_number(2).unwrap();
        assert_eq!(peaks.charges, vec![0.0; 3]);
        assert!(peaks.description.contains("ms2 325.00@"));
        assert_eq!(raw.cache().len(), 2);

        let (peaks, rt) = raw.get_scan_ms1(0.45).unwrap();
        assert_eq!(rt, 0.5);
        assert_eq!(peaks.masses, vec![400.0, 500.0]);

        let (peaks, rt) = raw.get_scan_ms2(0.2, Some(410.5)).unwrap();
        assert_eq!(rt, 0.25);
        assert_eq!(peaks.len(), 3);

        assert_eq!(
            raw.scan_event_str_from_scan_number(1).unwrap(),
            "FTMS + p ESI Full ms [300.0000-1500.0000]"
        );
        assert!(raw.get_scan_from_scan_number(0).unwrap_err().is_out_of_range());
    }

    #[test_log::test]
    fn test_tic_ms2() {
        let mut raw = make_raw();
        let tic = raw.tic_ms2(325.0, DEFAULT_PRECURSOR_TOLERANCE).unwrap();
        assert_eq!(tic.times, vec![0.125, 0.625]);
        assert_eq!(tic.intensities, vec![6.0, 6.0]);
        assert!(raw.tic_ms2(999.0, 0.01).unwrap().is_empty());
    }

    #[test_log::test]
    fn test_averaging_by_rt() {
        let raw = make_raw();
        let spec = raw
            .average_ms2_scans_by_rt(0.1, 0.6, 325.0, 10.0, ToleranceUnits::PPM)
            .unwrap();
        assert_eq!(spec.masses, vec![150.0, 250.0]);
        assert_eq!(spec.charges, vec![0.0, 0.0]);
        assert!(raw
            .averaged_ms2_scans(2, 9, 325.0, 10.0, ToleranceUnits::PPM)
            .unwrap_err()
            .is_out_of_range());
    }

    #[test_log::test]
    fn test_close() {
        let raw = make_raw();
        raw.close();
    }
}
