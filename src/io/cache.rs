use std::sync::Arc;

use indexmap::IndexMap;

use crate::io::traits::{MetadataFacade, RawFileError};
use crate::spectrum::ScanPeaks;

/// How many decoded scans a [`SpectrumCache`] retains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CachePolicy {
    /// Keep every scan ever decoded
    #[default]
    Unbounded,
    /// Keep at most this many scans, evicting the oldest entry first
    Fifo(usize),
    /// Never retain anything
    Disabled,
}

/// Memoizes decoded scan peaks by scan number.
///
/// The cache never changes what is returned for a scan, only how often the
/// underlying [`MetadataFacade`] is asked to decode it.
#[derive(Debug, Default, Clone)]
pub struct SpectrumCache {
    policy: CachePolicy,
    entries: IndexMap<u32, Arc<ScanPeaks>>,
}

impl SpectrumCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: IndexMap::new(),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, scan_number: u32) -> bool {
        self.entries.contains_key(&scan_number)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Decode a scan's peaks without touching any cache.
    ///
    /// Fourier-transform scans are read from their centroid stream, anything else
    /// from the segmented scan with zero charges.
    pub fn decode<F: MetadataFacade + ?Sized>(
        facade: &F,
        scan_number: u32,
    ) -> Result<ScanPeaks, RawFileError> {
        let event = facade.scan_event_of(scan_number)?;
        let peaks = if event.mass_analyzer.is_fourier_transform() {
            let stream = facade.centroid_stream_of(scan_number)?;
            if stream.charges.len() != stream.masses.len()
                || stream.intensities.len() != stream.masses.len()
            {
                return Err(RawFileError::scan_read(
                    scan_number,
                    "centroid stream arrays differ in length",
                ));
            }
            ScanPeaks::from_centroids(stream, event.filter_text)
        } else {
            let scan = facade.segmented_scan_of(scan_number)?;
            if scan.intensities.len() != scan.positions.len() {
                return Err(RawFileError::scan_read(
                    scan_number,
                    "segmented scan arrays differ in length",
                ));
            }
            ScanPeaks::from_segmented(scan, event.filter_text)
        };
        Ok(peaks)
    }

    /// Get the peaks of `scan_number`, decoding and storing them on first access
    pub fn get<F: MetadataFacade + ?Sized>(
        &mut self,
        facade: &F,
        scan_number: u32,
    ) -> Result<Arc<ScanPeaks>, RawFileError> {
        if let Some(hit) = self.entries.get(&scan_number) {
            return Ok(Arc::clone(hit));
        }
        let peaks = Arc::new(Self::decode(facade, scan_number)?);
        self.store(scan_number, Arc::clone(&peaks));
        Ok(peaks)
    }

    fn store(&mut self, scan_number: u32, peaks: Arc<ScanPeaks>) {
        match self.policy {
            CachePolicy::Unbounded => {
                self.entries.insert(scan_number, peaks);
            }
            CachePolicy::Fifo(capacity) => {
                if capacity == 0 {
                    return;
                }
                while self.entries.len() >= capacity {
                    self.entries.shift_remove_index(0);
                }
                self.entries.insert(scan_number, peaks);
            }
            CachePolicy::Disabled => {}
        }
    }
}
