use std::fs;
use std::io::{self, prelude::*, BufWriter};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::io::compression::is_gzipped_extension;
use crate::spectrum::Polarity;

/// Format a float the way a shortest round-trip `repr` does. Integral values keep
/// a trailing `.0` so `60.0` doesn't collapse into `60`, and magnitudes below `1e-4`
/// or from `1e16` up switch to exponent form with a signed, two digit exponent.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let text = format!("{value:e}");
        return match text.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => text,
        };
    }
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// One spectrum block of an MGF file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MgfSpectrum {
    pub title: String,
    pub scan_number: u32,
    /// In minutes, written in seconds
    pub retention_time: f64,
    pub precursor_mz: Option<f64>,
    pub charge: Option<(u32, Polarity)>,
    /// The title of the scan this one was derived from
    pub precursor_reference: Option<String>,
    pub masses: Vec<f64>,
    pub intensities: Vec<f64>,
}

impl MgfSpectrum {
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    /// The peaks as (mass, intensity) pairs in ascending mass order, ties broken
    /// by intensity
    pub fn sorted_peaks(&self) -> Vec<(f64, f64)> {
        let mut peaks: Vec<(f64, f64)> = self
            .masses
            .iter()
            .copied()
            .zip(self.intensities.iter().copied())
            .collect();
        peaks.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        peaks
    }
}

/// Writes [`MgfSpectrum`] blocks to a stream.
///
/// Blocks without peaks are written without their `END IONS` terminator unless
/// [`MGFWriter::set_terminate_empty_spectra`] is turned on.
pub struct MGFWriter<W: io::Write> {
    pub handle: io::BufWriter<W>,
    pub offset: usize,
    terminate_empty_spectra: bool,
}

impl<W: io::Write> MGFWriter<W> {
    pub fn new(file: W) -> MGFWriter<W> {
        let handle = io::BufWriter::with_capacity(500, file);
        MGFWriter {
            handle,
            offset: 0,
            terminate_empty_spectra: false,
        }
    }

    pub fn terminate_empty_spectra(&self) -> bool {
        self.terminate_empty_spectra
    }

    pub fn set_terminate_empty_spectra(&mut self, value: bool) {
        self.terminate_empty_spectra = value;
    }

    /// The number of spectrum blocks written so far
    pub fn len(&self) -> usize {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset == 0
    }

    pub fn into_inner(self) -> BufWriter<W> {
        self.handle
    }

    /// Write a spectrum header `KEY=value`
    pub fn write_kv(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.handle.write_all(key.as_bytes())?;
        self.handle.write_all(b"=")?;
        self.handle.write_all(value.as_bytes())?;
        self.handle.write_all(b"\n")?;
        Ok(())
    }

    /// Write the header of a spectrum, everything after `BEGIN IONS`, before writing
    /// the peak list.
    pub fn write_header(&mut self, spectrum: &MgfSpectrum) -> io::Result<()> {
        self.write_kv("TITLE", &spectrum.title)?;
        self.write_kv("SCANS", &spectrum.scan_number.to_string())?;
        self.write_kv(
            "RTINSECONDS",
            &format_float(spectrum.retention_time * 60.0),
        )?;
        if let Some(mz) = spectrum.precursor_mz {
            self.write_kv("PEPMASS", &format_float(mz))?;
        }
        if let Some((z, polarity)) = spectrum.charge {
            self.write_kv("CHARGE", &format!("{z}{}", polarity.sign()))?;
        }
        if let Some(reference) = &spectrum.precursor_reference {
            self.write_kv("PRECURSORSCAN", reference)?;
        }
        Ok(())
    }

    /// Write the peak list of a spectrum, everything until the `END IONS`
    pub fn write_peaks(&mut self, spectrum: &MgfSpectrum) -> io::Result<()> {
        for (mz, inten) in spectrum.sorted_peaks() {
            writeln!(self.handle, "{mz:.5} {inten:.3}")?;
        }
        Ok(())
    }

    /// Write a spectrum from start to finish
    pub fn write(&mut self, spectrum: &MgfSpectrum) -> io::Result<()> {
        if spectrum.masses.len() != spectrum.intensities.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Spectrum {} has {} masses but {} intensities",
                    spectrum.scan_number,
                    spectrum.masses.len(),
                    spectrum.intensities.len()
                ),
            ));
        }
        self.handle.write_all(b"BEGIN IONS\n")?;
        self.write_header(spectrum)?;
        if spectrum.is_empty() {
            log::debug!("Spectrum {} has no peaks", spectrum.scan_number);
            if self.terminate_empty_spectra {
                self.handle.write_all(b"END IONS\n")?;
            }
        } else {
            self.write_peaks(spectrum)?;
            self.handle.write_all(b"END IONS\n")?;
        }
        self.offset += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.handle.flush()
    }
}

impl MGFWriter<Box<dyn io::Write>> {
    /// Create a file at `path`, compressing it with gzip if the path ends in `.gz`
    pub fn create_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let handle = fs::File::create(path)?;
        let inner: Box<dyn io::Write> = if is_gzipped_extension(path) {
            Box::new(GzEncoder::new(handle, Compression::default()))
        } else {
            Box::new(handle)
        };
        Ok(Self::new(inner))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn make_spectrum() -> MgfSpectrum {
        MgfSpectrum {
            title: "controllerType=0 controllerNumber=1 scan=2".into(),
            scan_number: 2,
            retention_time: 1.0,
            precursor_mz: Some(501.0),
            charge: Some((2, Polarity::Positive)),
            precursor_reference: None,
            masses: vec![300.123456, 150.5, 150.5],
            intensities: vec![10.0, 2.25, 1.0],
        }
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(60.0), "60.0");
        assert_eq!(format_float(7.5), "7.5");
        assert_eq!(format_float(501.0), "501.0");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(1e15), "1000000000000000.0");
    }

    #[test]
    fn test_format_float_exponents() {
        assert_eq!(format_float(6e-5), "6e-05");
        assert_eq!(format_float(-1.25e-7), "-1.25e-07");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.5e16), "1.5e+16");
        assert_eq!(format_float(1e100), "1e+100");
        assert_eq!(format_float(f64::NAN), "nan");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }

    #[test]
    fn test_write_record() -> io::Result<()> {
        let mut writer = MGFWriter::new(Vec::new());
        writer.write(&make_spectrum())?;
        assert_eq!(writer.len(), 1);
        let buf = writer.into_inner().into_inner().map_err(|e| e.into_error())?;
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "BEGIN IONS\n\
             TITLE=controllerType=0 controllerNumber=1 scan=2\n\
             SCANS=2\n\
             RTINSECONDS=60.0\n\
             PEPMASS=501.0\n\
             CHARGE=2+\n\
             150.50000 1.000\n\
             150.50000 2.250\n\
             300.12346 10.000\n\
             END IONS\n"
        );
        Ok(())
    }

    #[test]
    fn test_empty_spectrum() -> io::Result<()> {
        let mut spec = make_spectrum();
        spec.masses.clear();
        spec.intensities.clear();
        spec.charge = Some((3, Polarity::Negative));
        spec.precursor_reference = Some("controllerType=0 controllerNumber=1 scan=1".into());

        let mut writer = MGFWriter::new(Vec::new());
        writer.write(&spec)?;
        let buf = writer.into_inner().into_inner().map_err(|e| e.into_error())?;
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("CHARGE=3-\n"));
        assert!(text.ends_with("PRECURSORSCAN=controllerType=0 controllerNumber=1 scan=1\n"));
        assert!(!text.contains("END IONS"));

        let mut writer = MGFWriter::new(Vec::new());
        writer.set_terminate_empty_spectra(true);
        writer.write(&spec)?;
        let buf = writer.into_inner().into_inner().map_err(|e| e.into_error())?;
        assert!(String::from_utf8(buf).unwrap().ends_with("END IONS\n"));
        Ok(())
    }

    #[test]
    fn test_mismatched_arrays() {
        let mut spec = make_spectrum();
        spec.intensities.pop();
        let mut writer = MGFWriter::new(Vec::new());
        assert!(writer.write(&spec).is_err());
        assert!(writer.is_empty());
    }
}
