pub use crate::io::traits::{MetadataFacade, OpenRawFile};
pub use crate::io::scan_index::ScanSubset;
pub use crate::mass_error::{MassOptions, ToleranceUnits};
pub use std::io::prelude::*;
