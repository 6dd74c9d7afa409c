//! Common, IO-related code.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use flate2::bufread::MultiGzDecoder;

/// Transparently open a file with gzip decoder.
///
/// Catalog reference files are distributed both plain and gzipped; the
/// `.gz` extension decides which reader is built.
pub fn open_read_maybe_gz<P>(path: P) -> Result<Box<dyn BufRead>, std::io::Error>
where
    P: AsRef<Path>,
{
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for reading", path.as_ref());
        let file = File::open(path)?;
        let bufreader = BufReader::new(file);
        let decoder = MultiGzDecoder::new(bufreader);
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        tracing::trace!("Opening {:?} as plain text for reading", path.as_ref());
        let file = File::open(path).map(BufReader::new)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Read a possibly gzipped file to a string.
pub fn read_to_string_maybe_gz<P>(path: P) -> Result<String, std::io::Error>
where
    P: AsRef<Path>,
{
    use std::io::Read as _;

    let mut reader = open_read_maybe_gz(path)?;
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    Ok(content)
}

#[cfg(test)]
mod test {
    use std::io::Write as _;

    use pretty_assertions::assert_eq;

    #[test]
    fn open_plain_text() -> Result<(), anyhow::Error> {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile()?;
        writeln!(file, "hello")?;
        file.flush()?;

        let content = super::read_to_string_maybe_gz(file.path())?;
        assert_eq!(content, "hello\n");
        Ok(())
    }

    #[test]
    fn open_gzip() -> Result<(), anyhow::Error> {
        let file = tempfile::Builder::new().suffix(".gz").tempfile()?;
        {
            let mut encoder = flate2::write::GzEncoder::new(
                std::fs::File::create(file.path())?,
                flate2::Compression::default(),
            );
            encoder.write_all(b"hello\n")?;
            encoder.finish()?;
        }

        let content = super::read_to_string_maybe_gz(file.path())?;
        assert_eq!(content, "hello\n");
        Ok(())
    }
}
