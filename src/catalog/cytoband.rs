//! Cytoband coordinate lookup.
//!
//! Loads a UCSC-style `cytoBand.txt` table and answers "which band covers
//! this position" queries through per-chromosome interval trees.

use std::collections::HashMap;

use bio::data_structures::interval_tree::ArrayBackedIntervalTree;

use crate::common::strip_chr_prefix;

/// One row of the cytoband table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CytobandEntry {
    /// Chromosome name (without `chr` prefix).
    pub chrom: String,
    /// 0-based start position.
    pub start: i64,
    /// End position.
    pub end: i64,
    /// Band label, e.g. `p36.33`.
    pub band: String,
}

/// Interval-tree backed index over cytobands.
#[derive(Debug, Default)]
pub struct CytobandIndex {
    trees: HashMap<String, ArrayBackedIntervalTree<i64, String>>,
}

impl CytobandIndex {
    /// Build the index from `(chrom, start, end, band)` entries.
    pub fn new(entries: Vec<CytobandEntry>) -> Self {
        let mut trees: HashMap<String, ArrayBackedIntervalTree<i64, String>> = HashMap::new();
        for entry in entries {
            let tree = trees
                .entry(strip_chr_prefix(&entry.chrom).to_string())
                .or_insert_with(ArrayBackedIntervalTree::new);
            tree.insert(entry.start..entry.end, entry.band);
        }
        for tree in trees.values_mut() {
            tree.index();
        }
        Self { trees }
    }

    /// Load the index from a `cytoBand.txt`-style TSV file.
    ///
    /// Columns: chrom, start, end, band, (stain).  The file has no header.
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, anyhow::Error> {
        let reader = crate::common::io::open_read_maybe_gz(path.as_ref()).map_err(|e| {
            anyhow::anyhow!(
                "could not open cytoband file {}: {}",
                path.as_ref().display(),
                e
            )
        })?;
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut entries = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            if record.len() < 4 {
                anyhow::bail!(
                    "cytoband file {}, line {}: expected at least 4 columns",
                    path.as_ref().display(),
                    i + 1
                );
            }
            entries.push(CytobandEntry {
                chrom: record[0].to_string(),
                start: record[1].parse()?,
                end: record[2].parse()?,
                band: record[3].to_string(),
            });
        }
        Ok(Self::new(entries))
    }

    /// Return the band covering `pos` on `chrom`, if any.
    pub fn band_at(&self, chrom: &str, pos: i64) -> Option<String> {
        let tree = self.trees.get(strip_chr_prefix(chrom))?;
        tree.find(pos..pos.checked_add(1)?)
            .first()
            .map(|entry| entry.data().clone())
    }

    /// Return the coordinates of a locus string such as `1p36.33` or `Xq28`.
    ///
    /// Range loci (`1p36.33-p36.32`) resolve to the span of both bands.
    pub fn locus_coordinates(&self, locus: &str) -> Option<(String, i64, i64)> {
        let split = locus.find(|c| c == 'p' || c == 'q')?;
        let (chrom, bands) = locus.split_at(split);
        let tree = self.trees.get(strip_chr_prefix(chrom))?;

        let mut start = i64::MAX;
        let mut end = i64::MIN;
        for band in bands.split('-') {
            for entry in tree.find(0..i64::MAX) {
                if entry.data().starts_with(band) {
                    start = start.min(entry.interval().start);
                    end = end.max(entry.interval().end);
                }
            }
        }
        if start <= end {
            Some((strip_chr_prefix(chrom).to_string(), start, end))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn example_index() -> CytobandIndex {
        CytobandIndex::new(vec![
            CytobandEntry {
                chrom: String::from("1"),
                start: 0,
                end: 2_300_000,
                band: String::from("p36.33"),
            },
            CytobandEntry {
                chrom: String::from("1"),
                start: 2_300_000,
                end: 5_400_000,
                band: String::from("p36.32"),
            },
            CytobandEntry {
                chrom: String::from("X"),
                start: 147_100_000,
                end: 155_270_560,
                band: String::from("q28"),
            },
        ])
    }

    #[rstest::rstest]
    #[case("1", 80_000, Some("p36.33"))]
    #[case("chr1", 80_000, Some("p36.33"))]
    #[case("1", 3_000_000, Some("p36.32"))]
    #[case("X", 150_000_000, Some("q28"))]
    #[case("2", 80_000, None)]
    #[case("1", 99_999_999, None)]
    fn band_at(#[case] chrom: &str, #[case] pos: i64, #[case] expected: Option<&str>) {
        let index = example_index();
        assert_eq!(index.band_at(chrom, pos), expected.map(String::from));
    }

    #[test]
    fn locus_coordinates_single_band() {
        let index = example_index();
        assert_eq!(
            index.locus_coordinates("1p36.32"),
            Some((String::from("1"), 2_300_000, 5_400_000))
        );
    }

    #[test]
    fn locus_coordinates_band_range() {
        let index = example_index();
        assert_eq!(
            index.locus_coordinates("1p36.33-p36.32"),
            Some((String::from("1"), 0, 5_400_000))
        );
    }

    #[test]
    fn locus_coordinates_unknown() {
        let index = example_index();
        assert_eq!(index.locus_coordinates("7q11"), None);
    }
}
