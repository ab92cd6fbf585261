use num_traits::Float;

use crate::io::traits::{AcquisitionSummary, MetadataFacade, RawFileError};
use crate::spectrum::MSOrder;

/// Which ordered sequence of scans a time query searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanSubset {
    All,
    MS1,
    MS2,
}

impl ScanSubset {
    fn name(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::MS1 => "MS1",
            Self::MS2 => "MS2",
        }
    }
}

/// Find the position of the value closest to `target`. Ties resolve to the
/// earliest position.
pub(crate) fn nearest_position<T: Float, I: IntoIterator<Item = T>>(
    values: I,
    target: T,
) -> Option<usize> {
    let mut best: Option<(usize, T)> = None;
    for (i, v) in values.into_iter().enumerate() {
        let err = (v - target).abs();
        match best {
            Some((_, best_err)) if !(err < best_err) => {}
            _ => best = Some((i, err)),
        }
    }
    best.map(|(i, _)| i)
}

/// Scan numbers paired with their retention times, in scan number order.
///
/// The two arrays are only ever extended together.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSeries {
    scan_numbers: Vec<u32>,
    times: Vec<f64>,
}

impl TimeSeries {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            scan_numbers: Vec::with_capacity(capacity),
            times: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, scan_number: u32, time: f64) {
        self.scan_numbers.push(scan_number);
        self.times.push(time);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.scan_numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scan_numbers.is_empty()
    }

    pub fn scan_numbers(&self) -> &[u32] {
        &self.scan_numbers
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<(u32, f64)> {
        Some((*self.scan_numbers.get(index)?, *self.times.get(index)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.scan_numbers
            .iter()
            .copied()
            .zip(self.times.iter().copied())
    }

    /// The entry whose time is closest to `time`
    pub fn nearest(&self, time: f64) -> Option<(u32, f64)> {
        nearest_position(self.times.iter().copied(), time).and_then(|i| self.get(i))
    }
}

/// MS2 scan numbers paired with the precursor mass from their scan filter
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrecursorMassTable {
    scan_numbers: Vec<u32>,
    masses: Vec<f64>,
    unique_masses: Vec<f64>,
}

impl PrecursorMassTable {
    pub fn push(&mut self, scan_number: u32, mass: f64) {
        self.scan_numbers.push(scan_number);
        self.masses.push(mass);
    }

    fn finish(&mut self) {
        let mut unique = self.masses.clone();
        unique.sort_by(|a, b| a.total_cmp(b));
        unique.dedup();
        self.unique_masses = unique;
    }

    pub fn len(&self) -> usize {
        self.scan_numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scan_numbers.is_empty()
    }

    pub fn scan_numbers(&self) -> &[u32] {
        &self.scan_numbers
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    /// The sorted, distinct precursor masses
    pub fn unique_masses(&self) -> &[f64] {
        &self.unique_masses
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.scan_numbers
            .iter()
            .copied()
            .zip(self.masses.iter().copied())
    }

    /// Scan numbers whose precursor mass lies within `tolerance` Da of `mass`
    pub fn scans_within(&self, mass: f64, tolerance: f64) -> impl Iterator<Item = u32> + '_ {
        self.iter()
            .filter(move |(_, m)| (m - mass).abs() <= tolerance)
            .map(|(s, _)| s)
    }
}

/// The classification of a single scan gathered while building a [`ScanIndex`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanRecord {
    pub scan_number: u32,
    pub retention_time: f64,
    pub ms_order: MSOrder,
    pub precursor_mass: Option<f64>,
}

impl ScanRecord {
    pub fn read<F: MetadataFacade + ?Sized>(
        facade: &F,
        scan_number: u32,
    ) -> Result<Self, RawFileError> {
        let retention_time = facade.retention_time_of(scan_number)?;
        let event = facade.scan_event_of(scan_number)?;
        let precursor_mass = if event.ms_order == MSOrder::MS2 {
            event.get_reaction(0).map(|r| r.precursor_mass)
        } else {
            None
        };
        Ok(Self {
            scan_number,
            retention_time,
            ms_order: event.ms_order,
            precursor_mass,
        })
    }
}

/**
Retention time lookup tables over one acquisition.

Four sequences are built in a single pass in scan number order: every scan,
the MS1 scans, the MS2 scans and the MS2 scans' filter precursor masses. The
index never changes after it is built.
*/
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanIndex {
    first_scan: u32,
    total_time: f64,
    all: TimeSeries,
    ms1: TimeSeries,
    ms2: TimeSeries,
    ms2_precursors: PrecursorMassTable,
}

impl ScanIndex {
    /// Build the index from records that are already in scan number order.
    ///
    /// The records are expected to be contiguous starting at `first_scan`, since
    /// scan numbers are mapped to retention times by their offset from it. Precursor
    /// entries that fall outside that range are never matched by mass queries.
    pub fn from_records<I: IntoIterator<Item = ScanRecord>>(
        first_scan: u32,
        total_time: f64,
        records: I,
    ) -> Self {
        let records = records.into_iter();
        let mut this = Self {
            first_scan,
            total_time,
            all: TimeSeries::with_capacity(records.size_hint().0),
            ..Default::default()
        };
        for rec in records {
            this.all.push(rec.scan_number, rec.retention_time);
            match rec.ms_order {
                MSOrder::MS1 => this.ms1.push(rec.scan_number, rec.retention_time),
                MSOrder::MS2 => {
                    this.ms2.push(rec.scan_number, rec.retention_time);
                    if let Some(mass) = rec.precursor_mass {
                        this.ms2_precursors.push(rec.scan_number, mass);
                    }
                }
                _ => {}
            }
        }
        this.ms2_precursors.finish();
        log::debug!(
            "Indexed {} scans, {} MS1, {} MS2, {} MS2 precursor masses ({} distinct)",
            this.all.len(),
            this.ms1.len(),
            this.ms2.len(),
            this.ms2_precursors.len(),
            this.ms2_precursors.unique_masses().len()
        );
        this
    }

    /// Build the index by visiting every scan of `facade` once
    pub fn build<F: MetadataFacade + ?Sized>(
        facade: &F,
        summary: &AcquisitionSummary,
    ) -> Result<Self, RawFileError> {
        let start = summary.first_scan;
        let end = start + summary.scan_count;
        let records = (start..end)
            .map(|scan_number| ScanRecord::read(facade, scan_number))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_records(start, summary.total_time, records))
    }

    /// Build the index classifying scans on the `rayon` thread pool. The
    /// sequences come out in the same order as [`ScanIndex::build`].
    #[cfg(feature = "parallelism")]
    pub fn build_parallel<F: MetadataFacade + Sync + ?Sized>(
        facade: &F,
        summary: &AcquisitionSummary,
    ) -> Result<Self, RawFileError> {
        use rayon::prelude::*;
        let start = summary.first_scan;
        let end = start + summary.scan_count;
        let records = (start..end)
            .into_par_iter()
            .map(|scan_number| ScanRecord::read(facade, scan_number))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_records(start, summary.total_time, records))
    }

    pub fn first_scan(&self) -> u32 {
        self.first_scan
    }

    /// The last indexed scan number, equal to `first_scan - 1` when empty
    pub fn last_scan(&self) -> u32 {
        (self.first_scan + self.all.len() as u32).saturating_sub(1)
    }

    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn all(&self) -> &TimeSeries {
        &self.all
    }

    pub fn ms1(&self) -> &TimeSeries {
        &self.ms1
    }

    pub fn ms2(&self) -> &TimeSeries {
        &self.ms2
    }

    pub fn ms2_precursors(&self) -> &PrecursorMassTable {
        &self.ms2_precursors
    }

    /// The distinct MS2 precursor masses available for filtering, ascending
    pub fn ms2_filter_masses(&self) -> &[f64] {
        self.ms2_precursors.unique_masses()
    }

    pub fn subset(&self, subset: ScanSubset) -> &TimeSeries {
        match subset {
            ScanSubset::All => &self.all,
            ScanSubset::MS1 => &self.ms1,
            ScanSubset::MS2 => &self.ms2,
        }
    }

    pub fn check_scan_number(&self, scan_number: u32) -> Result<(), RawFileError> {
        if scan_number < self.first_scan || scan_number > self.last_scan() || self.is_empty() {
            Err(RawFileError::ScanOutOfRange {
                scan_number,
                first: self.first_scan,
                last: self.last_scan(),
            })
        } else {
            Ok(())
        }
    }

    pub fn check_time(&self, time: f64) -> Result<(), RawFileError> {
        if (0.0..=self.total_time).contains(&time) {
            Ok(())
        } else {
            Err(RawFileError::TimeOutOfRange {
                time,
                total_time: self.total_time,
            })
        }
    }

    /// The retention time of a scan, in constant time
    pub fn retention_time_of(&self, scan_number: u32) -> Result<f64, RawFileError> {
        self.check_scan_number(scan_number)?;
        let offset = (scan_number - self.first_scan) as usize;
        Ok(self.all.times()[offset])
    }

    /// Find the scan in `subset` whose retention time is closest to `time`,
    /// returning its scan number and actual retention time
    pub fn nearest_by_time(
        &self,
        time: f64,
        subset: ScanSubset,
    ) -> Result<(u32, f64), RawFileError> {
        self.check_time(time)?;
        self.subset(subset)
            .nearest(time)
            .ok_or(RawFileError::EmptySubset(subset.name()))
    }

    /// Find the MS2 scan closest to `time` among those whose filter precursor mass
    /// is within `tolerance` Da of `precursor_mz`
    pub fn nearest_ms2_by_time_and_mass(
        &self,
        time: f64,
        precursor_mz: f64,
        tolerance: f64,
    ) -> Result<(u32, f64), RawFileError> {
        self.check_time(time)?;
        let candidates: TimeSeries = self
            .ms2_precursors
            .scans_within(precursor_mz, tolerance)
            .filter_map(|scan_number| {
                let offset = scan_number.checked_sub(self.first_scan)? as usize;
                self.all.times().get(offset).map(|t| (scan_number, *t))
            })
            .fold(TimeSeries::default(), |mut acc, (s, t)| {
                acc.push(s, t);
                acc
            });
        candidates
            .nearest(time)
            .ok_or(RawFileError::PrecursorMassNotFound {
                precursor_mz,
                tolerance,
            })
    }
}
