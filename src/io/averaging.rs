//! Merging several MS2 scans that share a precursor into one spectrum.
//!
//! The numerics are delegated to [`MetadataFacade::average`]. This module only
//! prepares the request: a scan filter restating the precursor mass and the
//! tolerance options, and turns the merged scan into an [`AveragedSpectrum`].
use std::fmt::Display;

use log::debug;

use crate::io::traits::{MetadataFacade, RawFileError, ScanSelection};
use crate::mass_error::{MassOptions, ToleranceUnits};
use crate::spectrum::AveragedSpectrum;

/// The decimal places used for masses in synthesized filters and tolerance options
pub const FILTER_MASS_PRECISION: u8 = 4;

/// A scan filter split around its precursor mass token.
///
/// For `"FTMS + p ESI d Full ms2 325.1234@hcd30.00 [100.0000-1000.0000]"` the
/// parts are `"FTMS + p ESI d Full ms2 "`, `"325.1234"` and
/// `"@hcd30.00 [100.0000-1000.0000]"`. Joining the three parts reproduces the
/// input exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilterTemplate {
    prefix: String,
    precursor: String,
    suffix: String,
}

impl ScanFilterTemplate {
    /// Split a filter at its first `@`. The precursor token is the text between
    /// the last whitespace before the `@` and the `@` itself, and must be numeric.
    pub fn parse(filter: &str) -> Result<Self, RawFileError> {
        let err = || RawFileError::FilterParse(filter.to_string());
        let at = filter.find('@').ok_or_else(err)?;
        let (head, suffix) = filter.split_at(at);
        let token_start = head
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .ok_or_else(err)?;
        let (prefix, precursor) = head.split_at(token_start);
        if precursor.parse::<f64>().is_err() {
            return Err(err());
        }
        Ok(Self {
            prefix: prefix.to_string(),
            precursor: precursor.to_string(),
            suffix: suffix.to_string(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn precursor(&self) -> &str {
        &self.precursor
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn precursor_mass(&self) -> Option<f64> {
        self.precursor.parse().ok()
    }

    /// Render the filter with a different precursor mass, rounded to four decimals
    pub fn with_precursor(&self, precursor_mass: f64) -> String {
        format!(
            "{}{:.prec$}{}",
            self.prefix,
            precursor_mass,
            self.suffix,
            prec = FILTER_MASS_PRECISION as usize
        )
    }
}

impl Display for ScanFilterTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.prefix, self.precursor, self.suffix)
    }
}

fn averaging_options(tolerance: f64, units: ToleranceUnits) -> MassOptions {
    MassOptions::new(tolerance, units, FILTER_MASS_PRECISION)
}

/// Build the filter used to average `start_scan..=end_scan` around `precursor_mass`,
/// derived from the filter text of `start_scan`
pub fn synthesize_filter<F: MetadataFacade + ?Sized>(
    facade: &F,
    start_scan: u32,
    precursor_mass: f64,
) -> Result<String, RawFileError> {
    let event = facade.scan_event_of(start_scan)?;
    let template = ScanFilterTemplate::parse(&event.filter_text)?;
    Ok(template.with_precursor(precursor_mass))
}

/// Average the MS2 scans in the inclusive range `start_scan..=end_scan` whose
/// precursor matches `precursor_mass`
pub fn average_scan_range<F: MetadataFacade + ?Sized>(
    facade: &F,
    start_scan: u32,
    end_scan: u32,
    precursor_mass: f64,
    tolerance: f64,
    units: ToleranceUnits,
) -> Result<AveragedSpectrum, RawFileError> {
    let filter = synthesize_filter(facade, start_scan, precursor_mass)?;
    let options = averaging_options(tolerance, units);
    debug!("Averaging scans {start_scan}-{end_scan} with filter {filter:?}");
    let merged = facade.average(
        &ScanSelection::Range(start_scan, end_scan),
        Some(&filter),
        &options,
    )?;
    Ok(merged.into())
}

/// Average an explicit list of scans. No filter is applied, the caller is
/// responsible for choosing compatible scans.
pub fn average_scan_list<F: MetadataFacade + ?Sized>(
    facade: &F,
    scans: &[u32],
    tolerance: f64,
    units: ToleranceUnits,
) -> Result<AveragedSpectrum, RawFileError> {
    if scans.is_empty() {
        return Err(RawFileError::EmptySubset("averaged"));
    }
    let options = averaging_options(tolerance, units);
    debug!("Averaging {} listed scans", scans.len());
    let merged = facade.average(&ScanSelection::List(scans.to_vec()), None, &options)?;
    Ok(merged.into())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::memory::{MemoryRawFile, MemoryScan};
    use crate::spectrum::{AveragedScan, CentroidStream, MSOrder, ScanEvent, SegmentedScan};

    const FILTER: &str = "FTMS + p ESI d Full ms2 325.1234@hcd30.00 [100.0000-1000.0000]";

    #[test]
    fn test_parse_template() {
        let template = ScanFilterTemplate::parse(FILTER).unwrap();
        assert_eq!(template.prefix(), "FTMS + p ESI d Full ms2 ");
        assert_eq!(template.precursor(), "325.1234");
        assert_eq!(template.suffix(), "@hcd30.00 [100.0000-1000.0000]");
        assert_eq!(template.precursor_mass(), Some(325.1234));
        assert_eq!(template.to_string(), FILTER);
    }

    #[test]
    fn test_synthesize() {
        let template = ScanFilterTemplate::parse(FILTER).unwrap();
        assert_eq!(
            template.with_precursor(410.56789),
            "FTMS + p ESI d Full ms2 410.5679@hcd30.00 [100.0000-1000.0000]"
        );
    }

    #[test]
    fn test_parse_failures() {
        for bad in [
            "FTMS + p ESI Full ms [300.0000-1500.0000]",
            "325.1234@hcd30.00",
            "FTMS + p ESI d Full ms2 @hcd30.00",
            "FTMS + p ESI d Full ms2 abc@hcd30.00",
        ] {
            assert!(
                matches!(ScanFilterTemplate::parse(bad), Err(RawFileError::FilterParse(_))),
                "{bad} should not parse"
            );
        }
    }

    fn make_file() -> MemoryRawFile {
        let mut file = MemoryRawFile::new(1);
        for i in 0..3 {
            file.push_scan(MemoryScan::new(
                0.5 * i as f64,
                ScanEvent {
                    ms_order: MSOrder::MS2,
                    filter_text: FILTER.to_string(),
                    ..Default::default()
                },
            ));
        }
        file.record_average(
            ScanSelection::Range(1, 3),
            Some("FTMS + p ESI d Full ms2 410.5679@hcd30.00 [100.0000-1000.0000]".into()),
            AveragedScan {
                segmented_scan: SegmentedScan::new(vec![150.0, 250.0], vec![3.0, 4.0]),
                centroid_stream: Some(CentroidStream::new(
                    vec![150.01, 250.02],
                    vec![3.5, 4.5],
                    vec![1.0, 2.0],
                )),
            },
        );
        file.record_average(
            ScanSelection::List(vec![1, 3]),
            None,
            AveragedScan {
                segmented_scan: SegmentedScan::new(vec![150.0, 250.0], vec![3.0, 4.0]),
                centroid_stream: None,
            },
        );
        file
    }

    #[test_log::test]
    fn test_average_range() {
        let file = make_file();
        let spec =
            average_scan_range(&file, 1, 3, 410.56789, 10.0, ToleranceUnits::PPM).unwrap();
        assert_eq!(spec.masses, vec![150.01, 250.02]);
        assert_eq!(spec.charges, vec![1.0, 2.0]);

        // A different precursor synthesizes a filter nothing was recorded for
        assert!(average_scan_range(&file, 1, 3, 500.0, 10.0, ToleranceUnits::PPM).is_err());
    }

    #[test_log::test]
    fn test_average_list() {
        let file = make_file();
        let spec = average_scan_list(&file, &[1, 3], 10.0, ToleranceUnits::PPM).unwrap();
        assert_eq!(spec.masses, vec![150.0, 250.0]);
        assert_eq!(spec.charges, vec![0.0, 0.0]);
        assert!(matches!(
            average_scan_list(&file, &[], 10.0, ToleranceUnits::PPM),
            Err(RawFileError::EmptySubset(_))
        ));
    }
}
