//! Writing MSn scans as Mascot Generic Format spectrum blocks.
mod export;
mod writer;

pub use export::{
    calculate_selected_ion_mz, isolation_width_label, ExportConfig, ExportError, ExportSession,
    ExportSummary, MGFExporter, PeakSource, CHARGE_STATE_LABEL, MONOISOTOPIC_MZ_LABEL,
};
pub use writer::{format_float, MGFWriter, MgfSpectrum};
