use std::io;
use std::path::PathBuf;
use std::time;

use clap::{Parser, Subcommand};
use log::info;

use mzraw::io::{CachePolicy, MemoryRawFile, RawFile};
use mzraw::io::mgf::{ExportConfig, MGFWriter, PeakSource};
use mzraw::prelude::*;
use mzraw::MSOrderSet;

/// Inspect raw acquisitions captured as JSON and export them as MGF
#[derive(Parser)]
#[command(name = "mzraw")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the MSn scans of an acquisition to an MGF file
    Export {
        /// The acquisition to read
        inpath: PathBuf,
        /// The MGF file to write, gzipped if it ends in .gz
        #[arg(short, long)]
        outpath: PathBuf,
        /// An MS level to export, may be repeated. Defaults to MS2 only
        #[arg(short = 'm', long = "ms-order")]
        ms_orders: Vec<u8>,
        /// Read centroid data where the instrument provides it
        #[arg(long)]
        prefer_centroid: bool,
        /// Add a PRECURSORSCAN line pointing at each spectrum's parent scan
        #[arg(long)]
        precursor_reference: bool,
        /// Close blocks without peaks with END IONS
        #[arg(long)]
        terminate_empty: bool,
    },
    /// Summarize an acquisition's scans
    Info {
        inpath: PathBuf,
    },
}

fn export(
    inpath: PathBuf,
    outpath: PathBuf,
    ms_orders: Vec<u8>,
    prefer_centroid: bool,
    precursor_reference: bool,
    terminate_empty: bool,
) -> io::Result<()> {
    let mut config = ExportConfig::default()
        .with_precursor_reference(precursor_reference)
        .with_terminate_empty_spectra(terminate_empty);
    if !ms_orders.is_empty() {
        config = config.with_ms_orders(MSOrderSet::from_levels(ms_orders));
    }
    if prefer_centroid {
        config = config.with_peak_source(PeakSource::PreferCentroid);
    }

    let mut reader = RawFile::<MemoryRawFile>::open_path(&inpath)?;
    let mut writer = MGFWriter::create_path(&outpath)?;
    let summary = reader.export_mgf(&mut writer, &config)?;
    writer.flush()?;
    info!(
        "Wrote {} spectra to {}",
        summary.spectra_written,
        outpath.display()
    );
    reader.close();
    Ok(())
}

fn describe(inpath: PathBuf) -> io::Result<()> {
    let facade = MemoryRawFile::open_path(&inpath)?;
    let reader = RawFile::with_cache_policy(facade, CachePolicy::Disabled)?;
    let index = reader.index();
    println!("Path: {}", inpath.display());
    println!(
        "Scans: {} ({} - {})",
        reader.number_of_scans(),
        reader.first_scan(),
        reader.last_scan()
    );
    println!("Run length: {:0.3} minutes", reader.total_time_min());
    println!("MS1 scans: {}", index.ms1().len());
    println!("MS2 scans: {}", index.ms2().len());
    println!(
        "MS2 precursor masses: {} distinct",
        reader.ms2_filter_masses().len()
    );
    Ok(())
}

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = time::Instant::now();
    match cli.command {
        Commands::Export {
            inpath,
            outpath,
            ms_orders,
            prefer_centroid,
            precursor_reference,
            terminate_empty,
        } => export(
            inpath,
            outpath,
            ms_orders,
            prefer_centroid,
            precursor_reference,
            terminate_empty,
        )?,
        Commands::Info { inpath } => describe(inpath)?,
    }
    let elapsed = time::Instant::now() - start;
    eprintln!("Finished: {:0.2} seconds", elapsed.as_secs_f64());
    Ok(())
}
