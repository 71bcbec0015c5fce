/// Shared input opening for every tab-delimited and FASTA source
use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use noodles::bgzf;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Compression detected from a file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bgzf,
}

impl Compression {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Compression::Gzip,
            Some("bgz") => Compression::Bgzf,
            _ => Compression::None,
        }
    }
}

/// Open a file and auto-detect gzip/bgzip compression, returning a boxed BufRead
pub fn open_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let reader: Box<dyn BufRead> = match Compression::from_path(path) {
        Compression::Bgzf => Box::new(BufReader::new(bgzf::io::reader::Reader::new(file))),
        Compression::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(file))),
        Compression::None => Box::new(BufReader::new(file)),
    };
    Ok(reader)
}

/// File name up to its first underscore, used to prefix every output file.
///
/// "1145081_M_70.annotations" -> "1145081"
pub fn file_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.split('_').next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression as GzLevel;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    #[test]
    fn test_compression_from_extension() {
        assert_eq!(Compression::from_path(Path::new("a.tsv")), Compression::None);
        assert_eq!(Compression::from_path(Path::new("a.tsv.gz")), Compression::Gzip);
        assert_eq!(Compression::from_path(Path::new("a.tsv.bgz")), Compression::Bgzf);
    }

    #[test]
    fn test_open_gzip_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cov.tsv.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), GzLevel::default());
        encoder.write_all(b"k141_1\t12\n").unwrap();
        encoder.finish().unwrap();

        let mut content = String::new();
        open_input(&path).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "k141_1\t12\n");
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = open_input("/nonexistent/eggtab/input.tsv").err().unwrap();
        assert!(format!("{err}").contains("/nonexistent/eggtab/input.tsv"));
    }

    #[test]
    fn test_file_prefix() {
        assert_eq!(file_prefix(Path::new("/data/1145081_M_70.annotations")), "1145081");
        assert_eq!(file_prefix(Path::new("plain.tsv")), "plain.tsv");
    }
}
