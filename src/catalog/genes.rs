//! Gene and transcript catalog construction.
//!
//! Merges HGNC, Ensembl BioMart, gnomAD constraint, and (optionally) OMIM
//! gene annotations into one gene index keyed by HGNC id, together with a
//! reverse symbol/alias map used for symbol resolution everywhere else.

use indexmap::IndexMap;

use crate::catalog::cytoband::CytobandIndex;
use crate::catalog::omim::OmimGeneMap;
use crate::common::GenomeBuild;

/// One gene record of the catalog.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeneRecord {
    /// Stable numeric HGNC id.
    pub hgnc_id: u32,
    /// Primary HGNC symbol.
    pub hgnc_symbol: String,
    /// Alias and previous symbols.
    pub aliases: Vec<String>,
    /// Genome build of the coordinates.
    pub build: GenomeBuild,
    /// Chromosome name.
    pub chromosome: Option<String>,
    /// Start coordinate.
    pub start: Option<i64>,
    /// End coordinate.
    pub end: Option<i64>,
    /// Gene description.
    pub description: Option<String>,
    /// Ensembl gene id.
    pub ensembl_gene_id: Option<String>,
    /// Cytoband locus string from HGNC, e.g. `1p36.33`.
    pub location: Option<String>,
    /// Entrez gene id.
    pub entrez_id: Option<u32>,
    /// OMIM gene id.
    pub omim_id: Option<u32>,
    /// UCSC cross-reference.
    pub ucsc_id: Option<String>,
    /// UniProt cross-references.
    pub uniprot_ids: Vec<String>,
    /// RefSeq ids of the primary transcripts.
    pub primary_transcripts: Vec<String>,
    /// Inheritance models from OMIM, e.g. `AR`, `AD`.
    pub inheritance_models: Vec<String>,
    /// gnomAD pLI score.
    pub pli_score: Option<f64>,
}

/// One transcript record of the catalog, keyed by Ensembl transcript id.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TranscriptRecord {
    /// Ensembl transcript id.
    pub transcript_id: String,
    /// Parent gene HGNC id.
    pub hgnc_id: u32,
    /// Chromosome name.
    pub chrom: String,
    /// Start coordinate.
    pub start: i64,
    /// End coordinate.
    pub end: i64,
    /// Whether this is one of the gene's primary transcripts.
    pub is_primary: bool,
    /// Whether Ensembl flags this transcript as canonical.
    pub is_canonical: bool,
    /// RefSeq ids of the transcript.
    pub refseq_ids: Vec<String>,
    /// RefSeq id of the MANE Select match, if any.
    pub mane_select: Option<String>,
    /// RefSeq id of the MANE Plus Clinical match, if any.
    pub mane_plus_clinical: Option<String>,
}

/// Reverse entry of the symbol/alias map.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AliasEntry {
    /// The unambiguous HGNC id for this symbol, if resolvable.
    #[serde(rename = "true")]
    pub true_id: Option<u32>,
    /// All candidate HGNC ids.
    pub ids: Vec<u32>,
}

/// The assembled gene catalog.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct GeneIndex {
    /// Genome build the index was built for.
    pub build: GenomeBuild,
    /// Genes by HGNC id.
    pub genes: IndexMap<u32, GeneRecord>,
    /// Reverse map from symbol/alias to candidate ids.
    pub alias_map: IndexMap<String, AliasEntry>,
    /// Transcripts by Ensembl transcript id.
    pub transcripts: IndexMap<String, TranscriptRecord>,
}

impl GeneIndex {
    /// Resolve a symbol or alias to an HGNC id.
    ///
    /// Returns the unambiguous id, or `None` for unknown or ambiguous
    /// symbols.
    pub fn resolve_symbol(&self, symbol: &str) -> Option<u32> {
        self.alias_map.get(symbol).and_then(|entry| entry.true_id)
    }

    /// Look up a gene by HGNC id.
    pub fn gene(&self, hgnc_id: u32) -> Option<&GeneRecord> {
        self.genes.get(&hgnc_id)
    }
}

/// Code for accessing the `hgnc_complete_set.txt` file.
pub mod hgnc {
    /// Data structure for representing an entry of the table.
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde_with::skip_serializing_none]
    pub struct Entry {
        /// HGNC gene id, e.g. `HGNC:5`.
        pub hgnc_id: String,
        /// Primary gene symbol.
        pub symbol: String,
        /// Gene description.
        pub name: Option<String>,
        /// Pipe-separated alias symbols.
        #[serde(default)]
        pub alias_symbol: Option<String>,
        /// Pipe-separated previous symbols.
        #[serde(default)]
        pub prev_symbol: Option<String>,
        /// Cytoband locus string.
        #[serde(default)]
        pub location: Option<String>,
        /// Entrez gene id.
        #[serde(default)]
        pub entrez_id: Option<u32>,
        /// Ensembl gene id.
        #[serde(default)]
        pub ensembl_gene_id: Option<String>,
        /// RefSeq accession of the primary transcript.
        #[serde(default)]
        pub refseq_accession: Option<String>,
        /// OMIM gene id (possibly pipe-separated).
        #[serde(default)]
        pub omim_id: Option<String>,
        /// UCSC id.
        #[serde(default)]
        pub ucsc_id: Option<String>,
        /// Pipe-separated UniProt ids.
        #[serde(default)]
        pub uniprot_ids: Option<String>,
    }

    impl Entry {
        /// The numeric part of the `HGNC:nnn` id.
        pub fn numeric_hgnc_id(&self) -> Result<u32, super::Error> {
            self.hgnc_id
                .trim_start_matches("HGNC:")
                .parse::<u32>()
                .map_err(|_| super::Error::InvalidHgncId(self.hgnc_id.clone()))
        }
    }

    /// Read the `hgnc_complete_set.txt` file using the `csv` crate via serde.
    pub fn load_entries<P: AsRef<std::path::Path>>(path: &P) -> Result<Vec<Entry>, super::Error> {
        super::load_tsv(path, "hgnc_complete_set")
    }
}

/// Code for accessing the Ensembl BioMart gene export.
pub mod ensembl_genes {
    /// Data structure for representing an entry of the table.
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct Entry {
        /// Ensembl gene id.
        #[serde(rename = "Gene stable ID")]
        pub ensembl_gene_id: String,
        /// Chromosome or scaffold name.
        #[serde(rename = "Chromosome/scaffold name")]
        pub chromosome: String,
        /// Gene start coordinate.
        #[serde(rename = "Gene start (bp)")]
        pub gene_start: i64,
        /// Gene end coordinate.
        #[serde(rename = "Gene end (bp)")]
        pub gene_end: i64,
        /// HGNC id, e.g. `HGNC:5`.
        #[serde(rename = "HGNC ID", default)]
        pub hgnc_id: Option<String>,
    }

    /// Read the BioMart gene TSV using the `csv` crate via serde.
    pub fn load_entries<P: AsRef<std::path::Path>>(path: &P) -> Result<Vec<Entry>, super::Error> {
        super::load_tsv(path, "ensembl genes")
    }
}

/// Code for accessing the Ensembl BioMart transcript export.
pub mod ensembl_transcripts {
    /// Data structure for representing an entry of the table.
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct Entry {
        /// Ensembl gene id.
        #[serde(rename = "Gene stable ID")]
        pub ensembl_gene_id: String,
        /// Ensembl transcript id.
        #[serde(rename = "Transcript stable ID")]
        pub transcript_id: String,
        /// Chromosome or scaffold name.
        #[serde(rename = "Chromosome/scaffold name")]
        pub chromosome: String,
        /// Transcript start coordinate.
        #[serde(rename = "Transcript start (bp)")]
        pub transcript_start: i64,
        /// Transcript end coordinate.
        #[serde(rename = "Transcript end (bp)")]
        pub transcript_end: i64,
        /// RefSeq mRNA id.
        #[serde(rename = "RefSeq mRNA ID", default)]
        pub refseq_mrna: Option<String>,
        /// Predicted RefSeq mRNA id.
        #[serde(rename = "RefSeq mRNA predicted ID", default)]
        pub refseq_mrna_predicted: Option<String>,
        /// RefSeq ncRNA id.
        #[serde(rename = "RefSeq ncRNA ID", default)]
        pub refseq_ncrna: Option<String>,
        /// Ensembl canonical flag (`1` or empty).
        #[serde(rename = "Ensembl Canonical", default)]
        pub ensembl_canonical: Option<u8>,
        /// RefSeq id of the matched MANE Select transcript.
        #[serde(rename = "RefSeq match transcript (MANE Select)", default)]
        pub mane_select: Option<String>,
        /// RefSeq id of the matched MANE Plus Clinical transcript.
        #[serde(rename = "RefSeq match transcript (MANE Plus Clinical)", default)]
        pub mane_plus_clinical: Option<String>,
        /// HGNC id, e.g. `HGNC:5`.
        #[serde(rename = "HGNC ID", default)]
        pub hgnc_id: Option<String>,
    }

    /// Read the BioMart transcript TSV using the `csv` crate via serde.
    pub fn load_entries<P: AsRef<std::path::Path>>(path: &P) -> Result<Vec<Entry>, super::Error> {
        super::load_tsv(path, "ensembl transcripts")
    }
}

/// Code for accessing the gnomAD per-gene constraint file.
pub mod constraint {
    /// Data structure for representing an entry of the table.
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct Entry {
        /// Gene symbol.
        pub gene: String,
        /// pLI score.
        #[serde(rename = "pLI", default)]
        pub pli: Option<f64>,
    }

    /// Read the constraint TSV using the `csv` crate via serde.
    pub fn load_entries<P: AsRef<std::path::Path>>(path: &P) -> Result<Vec<Entry>, super::Error> {
        super::load_tsv(path, "gnomad constraint")
    }
}

/// Error type for catalog loading.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("problem opening {source_name}: {source}")]
    Io {
        source_name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("problem reading {source_name}: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },
    #[error("invalid HGNC id: {0}")]
    InvalidHgncId(String),
}

/// Read a TSV file with headers into serde rows, attributing errors to `source_name`.
fn load_tsv<P, T>(path: &P, source_name: &str) -> Result<Vec<T>, Error>
where
    P: AsRef<std::path::Path>,
    T: serde::de::DeserializeOwned,
{
    let reader =
        crate::common::io::open_read_maybe_gz(path.as_ref()).map_err(|source| Error::Io {
            source_name: source_name.to_string(),
            source,
        })?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let mut entries = Vec::new();
    for result in rdr.deserialize() {
        let entry: T = result.map_err(|source| Error::Csv {
            source_name: source_name.to_string(),
            source,
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Split a pipe-separated HGNC list cell into tokens.
fn split_pipes(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .unwrap_or_default()
        .split('|')
        .map(|s| s.trim().trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Build the gene index from the loaded catalog tables.
///
/// Coordinates come from Ensembl where available; genes without an Ensembl
/// match are back-filled from the cytoband table using their HGNC locus
/// string.
pub fn build_gene_index(
    build: GenomeBuild,
    hgnc_entries: Vec<hgnc::Entry>,
    ensembl_entries: Vec<ensembl_genes::Entry>,
    constraint_entries: Vec<constraint::Entry>,
    omim_genes: Option<&OmimGeneMap>,
    cytobands: Option<&CytobandIndex>,
) -> Result<GeneIndex, Error> {
    let mut coordinates: IndexMap<String, (String, i64, i64)> = IndexMap::new();
    for entry in &ensembl_entries {
        coordinates.insert(
            entry.ensembl_gene_id.clone(),
            (entry.chromosome.clone(), entry.gene_start, entry.gene_end),
        );
    }

    let mut pli_by_symbol: IndexMap<&str, f64> = IndexMap::new();
    for entry in &constraint_entries {
        if let Some(pli) = entry.pli {
            pli_by_symbol.insert(entry.gene.as_str(), pli);
        }
    }

    let mut genes = IndexMap::new();
    for entry in &hgnc_entries {
        let hgnc_id = entry.numeric_hgnc_id()?;
        let mut aliases = split_pipes(&entry.alias_symbol);
        aliases.extend(split_pipes(&entry.prev_symbol));

        let mut record = GeneRecord {
            hgnc_id,
            hgnc_symbol: entry.symbol.clone(),
            aliases,
            build,
            description: entry.name.clone(),
            ensembl_gene_id: entry.ensembl_gene_id.clone(),
            location: entry.location.clone(),
            entrez_id: entry.entrez_id,
            omim_id: entry
                .omim_id
                .as_deref()
                .and_then(|s| s.split('|').next())
                .and_then(|s| s.trim().parse().ok()),
            ucsc_id: entry.ucsc_id.clone(),
            uniprot_ids: split_pipes(&entry.uniprot_ids),
            primary_transcripts: split_pipes(&entry.refseq_accession),
            pli_score: pli_by_symbol.get(entry.symbol.as_str()).copied(),
            ..Default::default()
        };

        if let Some((chrom, start, end)) = entry
            .ensembl_gene_id
            .as_deref()
            .and_then(|ensg| coordinates.get(ensg))
        {
            record.chromosome = Some(chrom.clone());
            record.start = Some(*start);
            record.end = Some(*end);
        } else if let Some((chrom, start, end)) = entry
            .location
            .as_deref()
            .zip(cytobands)
            .and_then(|(locus, cyto)| cyto.locus_coordinates(locus))
        {
            record.chromosome = Some(chrom);
            record.start = Some(start);
            record.end = Some(end);
        } else {
            tracing::warn!(
                "no coordinates for gene {} ({})",
                entry.symbol,
                entry.hgnc_id
            );
        }

        if let Some(omim_genes) = omim_genes {
            if let Some(annotation) = omim_genes.annotation_for(&entry.symbol) {
                record.inheritance_models = annotation.inheritance.iter().cloned().collect();
                if record.omim_id.is_none() {
                    record.omim_id = Some(annotation.mim_number);
                }
            }
        }

        genes.insert(hgnc_id, record);
    }

    let alias_map = build_alias_map(&genes);

    Ok(GeneIndex {
        build,
        genes,
        alias_map,
        transcripts: IndexMap::new(),
    })
}

/// Build the reverse symbol/alias map of a gene set.
fn build_alias_map(genes: &IndexMap<u32, GeneRecord>) -> IndexMap<String, AliasEntry> {
    let mut alias_map: IndexMap<String, AliasEntry> = IndexMap::new();
    // First pass: collect candidates per symbol.
    for gene in genes.values() {
        for symbol in std::iter::once(&gene.hgnc_symbol).chain(gene.aliases.iter()) {
            let entry = alias_map.entry(symbol.clone()).or_default();
            if !entry.ids.contains(&gene.hgnc_id) {
                entry.ids.push(gene.hgnc_id);
            }
        }
    }
    // Second pass: a symbol resolves unambiguously to the gene whose primary
    // symbol it is, or to the single candidate.
    for (symbol, entry) in alias_map.iter_mut() {
        let primary = entry
            .ids
            .iter()
            .find(|id| {
                genes
                    .get(*id)
                    .map(|gene| &gene.hgnc_symbol == symbol)
                    .unwrap_or(false)
            })
            .copied();
        entry.true_id = primary.or(if entry.ids.len() == 1 {
            Some(entry.ids[0])
        } else {
            None
        });
    }
    alias_map
}

/// Attach transcripts to an existing gene index.
///
/// Transcripts whose gene cannot be resolved are warned about and skipped.
pub fn attach_transcripts(
    index: &mut GeneIndex,
    transcript_entries: Vec<ensembl_transcripts::Entry>,
) {
    let by_ensg: IndexMap<String, u32> = index
        .genes
        .values()
        .filter_map(|gene| {
            gene.ensembl_gene_id
                .as_ref()
                .map(|ensg| (ensg.clone(), gene.hgnc_id))
        })
        .collect();

    for entry in transcript_entries {
        let hgnc_id = entry
            .hgnc_id
            .as_deref()
            .and_then(|raw| raw.trim_start_matches("HGNC:").parse::<u32>().ok())
            .or_else(|| by_ensg.get(&entry.ensembl_gene_id).copied());
        let hgnc_id = match hgnc_id {
            Some(hgnc_id) => hgnc_id,
            None => {
                tracing::warn!(
                    "skipping transcript {} of unknown gene {}",
                    entry.transcript_id,
                    entry.ensembl_gene_id
                );
                continue;
            }
        };

        let refseq_ids: Vec<String> = [
            entry.refseq_mrna.as_ref(),
            entry.refseq_mrna_predicted.as_ref(),
            entry.refseq_ncrna.as_ref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect();

        let is_primary = index
            .genes
            .get(&hgnc_id)
            .map(|gene| {
                refseq_ids.iter().any(|refseq| {
                    gene.primary_transcripts
                        .iter()
                        .any(|primary| refseq.starts_with(primary.as_str()))
                })
            })
            .unwrap_or(false);

        let record = TranscriptRecord {
            transcript_id: entry.transcript_id.clone(),
            hgnc_id,
            chrom: entry.chromosome,
            start: entry.transcript_start,
            end: entry.transcript_end,
            is_primary,
            is_canonical: entry.ensembl_canonical == Some(1),
            refseq_ids,
            mane_select: entry.mane_select.filter(|s| !s.is_empty()),
            mane_plus_clinical: entry.mane_plus_clinical.filter(|s| !s.is_empty()),
        };
        index.transcripts.insert(entry.transcript_id, record);
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn hgnc_entry(hgnc_id: &str, symbol: &str, aliases: &str) -> hgnc::Entry {
        hgnc::Entry {
            hgnc_id: hgnc_id.to_string(),
            symbol: symbol.to_string(),
            name: Some(format!("{} description", symbol)),
            alias_symbol: if aliases.is_empty() {
                None
            } else {
                Some(aliases.to_string())
            },
            prev_symbol: None,
            location: Some(String::from("1p36.33")),
            entrez_id: None,
            ensembl_gene_id: Some(format!("ENSG_{}", symbol)),
            refseq_accession: Some(String::from("NM_080605")),
            omim_id: None,
            ucsc_id: None,
            uniprot_ids: None,
        }
    }

    fn example_index() -> GeneIndex {
        let hgnc_entries = vec![
            hgnc_entry("HGNC:17978", "B3GALT6", "beta3GalT6"),
            hgnc_entry("HGNC:24488", "POC1A", "WDR51A|SOFT"),
            // shares the alias "SOFT" with POC1A
            hgnc_entry("HGNC:30971", "SOFT1", "SOFT"),
        ];
        let ensembl_entries = vec![ensembl_genes::Entry {
            ensembl_gene_id: String::from("ENSG_B3GALT6"),
            chromosome: String::from("1"),
            gene_start: 1_232_237,
            gene_end: 1_235_041,
            hgnc_id: Some(String::from("HGNC:17978")),
        }];
        let constraint_entries = vec![constraint::Entry {
            gene: String::from("B3GALT6"),
            pli: Some(0.17),
        }];
        build_gene_index(
            GenomeBuild::Build37,
            hgnc_entries,
            ensembl_entries,
            constraint_entries,
            None,
            None,
        )
        .expect("index building should succeed")
    }

    #[test]
    fn gene_record_merging() {
        let index = example_index();
        let gene = index.gene(17978).expect("gene should exist");
        assert_eq!(gene.hgnc_symbol, "B3GALT6");
        assert_eq!(gene.chromosome.as_deref(), Some("1"));
        assert_eq!(gene.start, Some(1_232_237));
        assert_eq!(gene.pli_score, Some(0.17));
        assert_eq!(gene.primary_transcripts, vec![String::from("NM_080605")]);
    }

    #[test]
    fn alias_map_unambiguous_symbol() {
        let index = example_index();
        let entry = index.alias_map.get("B3GALT6").expect("symbol should exist");
        assert_eq!(entry.true_id, Some(17978));
        assert_eq!(entry.ids, vec![17978]);
        assert_eq!(index.resolve_symbol("beta3GalT6"), Some(17978));
    }

    #[test]
    fn alias_map_ambiguous_alias() {
        let index = example_index();
        let entry = index.alias_map.get("SOFT").expect("alias should exist");
        assert_eq!(entry.true_id, None);
        assert_eq!(entry.ids, vec![24488, 30971]);
        assert_eq!(index.resolve_symbol("SOFT"), None);
    }

    #[test]
    fn alias_map_primary_wins_over_ambiguity() {
        // "SOFT1" is both a primary symbol and unambiguous.
        let index = example_index();
        assert_eq!(index.resolve_symbol("SOFT1"), Some(30971));
    }

    #[test]
    fn coordinates_backfilled_from_cytobands() {
        let cytobands = CytobandIndex::new(vec![crate::catalog::cytoband::CytobandEntry {
            chrom: String::from("1"),
            start: 0,
            end: 2_300_000,
            band: String::from("p36.33"),
        }]);
        let index = build_gene_index(
            GenomeBuild::Build37,
            vec![hgnc_entry("HGNC:17978", "B3GALT6", "")],
            vec![],
            vec![],
            None,
            Some(&cytobands),
        )
        .expect("index building should succeed");
        let gene = index.gene(17978).expect("gene should exist");
        assert_eq!(gene.chromosome.as_deref(), Some("1"));
        assert_eq!(gene.start, Some(0));
        assert_eq!(gene.end, Some(2_300_000));
    }

    #[test]
    fn attach_transcripts_resolves_and_flags() {
        let mut index = example_index();
        attach_transcripts(
            &mut index,
            vec![ensembl_transcripts::Entry {
                ensembl_gene_id: String::from("ENSG_B3GALT6"),
                transcript_id: String::from("ENST00000379198"),
                chromosome: String::from("1"),
                transcript_start: 1_232_237,
                transcript_end: 1_235_041,
                refseq_mrna: Some(String::from("NM_080605")),
                refseq_mrna_predicted: None,
                refseq_ncrna: None,
                ensembl_canonical: Some(1),
                mane_select: Some(String::from("NM_080605.4")),
                mane_plus_clinical: None,
                hgnc_id: None,
            }],
        );
        let tx = index
            .transcripts
            .get("ENST00000379198")
            .expect("transcript should exist");
        assert_eq!(tx.hgnc_id, 17978);
        assert!(tx.is_canonical);
        assert!(tx.is_primary);
        assert_eq!(tx.mane_select.as_deref(), Some("NM_080605.4"));
    }

    #[test]
    fn invalid_hgnc_id_fails_load() {
        let result = build_gene_index(
            GenomeBuild::Build37,
            vec![hgnc_entry("HGNC:not-a-number", "GENE", "")],
            vec![],
            vec![],
            None,
            None,
        );
        assert!(matches!(result, Err(Error::InvalidHgncId(_))));
    }
}
