use std::path::Path;


/// Check whether a path ends in `.gz`, in any case
pub fn is_gzipped_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_gzip_extension() {
        assert!(is_gzipped_extension(Path::new("out/run.mgf.GZ")));
        assert!(is_gzipped_extension(Path::new("run.gz")));
        assert!(!is_gzipped_extension(Path::new("run.mgf")));
        assert!(!is_gzipped_extension(Path::new("gz")));
    }
}
