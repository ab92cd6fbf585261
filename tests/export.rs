use std::fs;
use std::io::{self, prelude::*};

use flate2::read::GzDecoder;

use mzraw::io::mgf::{ExportConfig, MGFWriter, CHARGE_STATE_LABEL, MONOISOTOPIC_MZ_LABEL};
use mzraw::io::{MemoryRawFile, MemoryScan, RawFile};
use mzraw::spectrum::{MSOrder, Polarity, Reaction, ScanEvent, Trailer};

fn ms1(rt: f64) -> MemoryScan {
    MemoryScan::new(
        rt,
        ScanEvent {
            ms_order: MSOrder::MS1,
            filter_text: "FTMS + p ESI Full ms [350.0000-1800.0000]".into(),
            ..Default::default()
        },
    )
    .with_segmented(vec![500.0], vec![1000.0])
}

fn ms2(rt: f64, precursor: f64, mono: &str, charge: &str) -> MemoryScan {
    let trailer: Trailer = [
        (CHARGE_STATE_LABEL, charge),
        (MONOISOTOPIC_MZ_LABEL, mono),
        ("MS2 Isolation Width:", "1.0"),
    ]
    .into_iter()
    .collect();
    MemoryScan::new(
        rt,
        ScanEvent {
            ms_order: MSOrder::MS2,
            polarity: Polarity::Positive,
            reactions: vec![Reaction::new(precursor, 3.0, 28.0)],
            filter_text: format!(
                "FTMS + c ESI d Full ms2 {precursor:.2}@hcd28.00 [100.0000-2000.0000]"
            ),
            ..Default::default()
        },
    )
    .with_segmented(vec![200.25, 175.125, 300.5], vec![12.5, 3.0, 8.0])
    .with_trailer(trailer)
}

fn make_raw() -> RawFile<MemoryRawFile> {
    let mut file = MemoryRawFile::new(1);
    file.push_scan(ms1(0.5));
    file.push_scan(ms2(0.75, 500.0, "501.0", "2"));
    file.push_scan(ms2(1.0, 500.0, "510.0", "0"));
    file.push_scan(ms1(1.5));
    RawFile::new(file).unwrap()
}

const EXPECTED: &str = "BEGIN IONS
TITLE=controllerType=0 controllerNumber=1 scan=2
SCANS=2
RTINSECONDS=45.0
PEPMASS=501.0
CHARGE=2+
175.12500 3.000
200.25000 12.500
300.50000 8.000
END IONS
BEGIN IONS
TITLE=controllerType=0 controllerNumber=1 scan=3
SCANS=3
RTINSECONDS=60.0
PEPMASS=500.0
175.12500 3.000
200.25000 12.500
300.50000 8.000
END IONS
";

#[test_log::test]
fn export_to_file() -> io::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("run.mgf");
    let mut raw = make_raw();
    {
        let mut writer = MGFWriter::create_path(&path)?;
        let summary = raw.export_mgf(&mut writer, &ExportConfig::default())?;
        assert_eq!(summary.spectra_written, 2);
        assert_eq!(summary.scans_visited, 4);
        writer.flush()?;
    }
    let text = fs::read_to_string(&path)?;
    assert_eq!(text, EXPECTED);

    // The index and cache keep working after an export
    assert_eq!(raw.scan_number_from_retention_time(1.4)?, 4);
    Ok(())
}

#[test_log::test]
fn export_to_gzip() -> io::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("run.mgf.gz");
    let mut raw = make_raw();
    {
        let mut writer = MGFWriter::create_path(&path)?;
        raw.export_mgf(&mut writer, &ExportConfig::default())?;
        writer.flush()?;
    }
    let raw_bytes = fs::read(&path)?;
    assert!(raw_bytes.starts_with(b"\x1f\x8b"));
    let mut text = String::new();
    GzDecoder::new(raw_bytes.as_slice()).read_to_string(&mut text)?;
    assert_eq!(text, EXPECTED);
    Ok(())
}

#[test_log::test]
fn precursor_reference_opt_in() -> io::Result<()> {
    let mut raw = make_raw();
    let mut writer = MGFWriter::new(Vec::new());
    raw.export_mgf(
        &mut writer,
        &ExportConfig::default().with_precursor_reference(true),
    )?;
    let buf = writer.into_inner().into_inner().map_err(|e| e.into_error())?;
    let text = String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    assert_eq!(
        text.matches("PRECURSORSCAN=controllerType=0 controllerNumber=1 scan=1\n")
            .count(),
        2
    );
    Ok(())
}

#[cfg(feature = "serde")]
mod fixtures {
    use super::*;
    use mzraw::io::RawFileError;

    #[test_log::test]
    fn open_json_fixture() -> io::Result<()> {
        let raw = make_raw();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("run.json");
        fs::write(&path, serde_json::to_string(raw.facade())?)?;

        let mut reopened = RawFile::<MemoryRawFile>::open_path(&path)?;
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(reopened.number_of_scans(), 4);
        assert_eq!(reopened.ms2_filter_masses(), &[500.0]);

        let mut writer = MGFWriter::new(Vec::new());
        reopened.export_mgf(&mut writer, &ExportConfig::default())?;
        let buf = writer.into_inner().into_inner().map_err(|e| e.into_error())?;
        assert_eq!(String::from_utf8_lossy(&buf), EXPECTED);
        Ok(())
    }

    #[test]
    fn missing_fixture_is_not_openable() {
        let dir = tempfile::tempdir().unwrap();
        let err = RawFile::<MemoryRawFile>::open_path(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, RawFileError::FileNotOpenable { .. }));
    }
}
