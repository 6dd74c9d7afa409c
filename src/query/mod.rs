//! Backend-neutral variant query construction and evaluation.
//!
//! Filters compile to a conjunction of clauses; disjunctions are expressed
//! as nested any-of groups.  The in-memory store evaluates the clauses
//! directly; other backends can translate them instead.

use crate::variant::{Category, Variant, VariantType};

/// Frequency sentinel meaning "match missing values only".
pub const MISSING_ONLY: f64 = -1.0;

/// Variant fields addressable by query clauses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    parse_display::Display,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ThousandGenomesFrequency,
    ExacFrequency,
    CaddScore,
    GeneticModels,
    HgncSymbols,
    FunctionalAnnotations,
    RegionAnnotations,
    Clnsig,
}

/// One query clause.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Clause {
    /// Positional overlap: `position <= end && variant.end >= start`.
    Overlap { chrom: String, start: i64, end: i64 },
    /// Numeric field below threshold, or absent.
    LtOrMissing { field: Field, threshold: f64 },
    /// Numeric field absent.
    Missing { field: Field },
    /// Numeric field above threshold; optionally also absent.
    Gt {
        field: Field,
        threshold: f64,
        include_missing: bool,
    },
    /// Set field intersects the given values.
    In { field: Field, values: Vec<String> },
    /// Any of the nested clauses holds.
    AnyOf(Vec<Clause>),
}

/// Recognized filter options.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FilterOptions {
    /// Scope; defaults to clinical.
    pub variant_type: Option<VariantType>,
    /// Chromosome for positional filtering.
    pub chrom: Option<String>,
    /// Region start; only effective with `chrom`.
    pub start: Option<i64>,
    /// Region end; only effective with `chrom`.
    pub end: Option<i64>,
    /// Upper 1000 Genomes frequency bound; `-1` matches missing only.
    pub thousand_genomes_frequency: Option<f64>,
    /// Upper ExAC frequency bound; `-1` matches missing only.
    pub exac_frequency: Option<f64>,
    /// Lower CADD bound.
    pub cadd_score: Option<f64>,
    /// Let variants without a CADD score through the CADD filter.
    #[serde(default)]
    pub cadd_inclusive: bool,
    /// Compatible inheritance models.
    #[serde(default)]
    pub genetic_models: Vec<String>,
    /// Gene symbols.
    #[serde(default)]
    pub hgnc_symbols: Vec<String>,
    /// Consequence terms.
    #[serde(default)]
    pub functional_annotations: Vec<String>,
    /// Region labels.
    #[serde(default)]
    pub region_annotations: Vec<String>,
    /// Parsed ClinVar significance terms.
    #[serde(default)]
    pub clinsig: Vec<String>,
}

/// A compiled query: conjunction of clauses plus fixed scope.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Query {
    /// Case the query is scoped to.
    pub case_id: String,
    /// Scope within the case.
    pub variant_type: VariantType,
    /// Restrict to one category.
    pub category: Option<Category>,
    /// Explicit document ids; bypasses nothing else.
    pub variant_ids: Option<Vec<String>>,
    /// All clauses must hold.
    pub clauses: Vec<Clause>,
}

/// Compile filter options into a query.
pub fn build_query(
    case_id: &str,
    options: &FilterOptions,
    variant_ids: Option<Vec<String>>,
    category: Option<Category>,
) -> Query {
    let mut clauses = Vec::new();

    if let Some(chrom) = &options.chrom {
        clauses.push(Clause::Overlap {
            chrom: chrom.clone(),
            start: options.start.unwrap_or(0),
            end: options.end.unwrap_or(i64::MAX),
        });
    }

    let mut frequency_clause = |field: Field, bound: Option<f64>| {
        if let Some(bound) = bound {
            if bound == MISSING_ONLY {
                clauses.push(Clause::Missing { field });
            } else {
                clauses.push(Clause::LtOrMissing {
                    field,
                    threshold: bound,
                });
            }
        }
    };
    frequency_clause(
        Field::ThousandGenomesFrequency,
        options.thousand_genomes_frequency,
    );
    frequency_clause(Field::ExacFrequency, options.exac_frequency);

    if let Some(threshold) = options.cadd_score {
        clauses.push(Clause::Gt {
            field: Field::CaddScore,
            threshold,
            include_missing: options.cadd_inclusive,
        });
    }

    let mut membership_clause = |field: Field, values: &[String]| {
        if !values.is_empty() {
            clauses.push(Clause::In {
                field,
                values: values.to_vec(),
            });
        }
    };
    membership_clause(Field::GeneticModels, &options.genetic_models);
    membership_clause(Field::HgncSymbols, &options.hgnc_symbols);
    membership_clause(Field::FunctionalAnnotations, &options.functional_annotations);
    membership_clause(Field::RegionAnnotations, &options.region_annotations);
    membership_clause(Field::Clnsig, &options.clinsig);

    Query {
        case_id: case_id.to_string(),
        variant_type: options.variant_type.unwrap_or_default(),
        category,
        variant_ids,
        clauses,
    }
}

impl Query {
    /// Evaluate the query against one variant.
    pub fn matches(&self, variant: &Variant) -> bool {
        if variant.case_id != self.case_id || variant.variant_type != self.variant_type {
            return false;
        }
        if let Some(category) = self.category {
            if variant.category != category {
                return false;
            }
        }
        if let Some(variant_ids) = &self.variant_ids {
            if !variant_ids.contains(&variant.document_id) {
                return false;
            }
        }
        self.clauses.iter().all(|clause| clause.matches(variant))
    }
}

impl Clause {
    /// Evaluate one clause against one variant.
    pub fn matches(&self, variant: &Variant) -> bool {
        match self {
            Clause::Overlap { chrom, start, end } => {
                variant.chromosome == *chrom
                    && variant.position <= *end
                    && variant.end >= *start
            }
            Clause::LtOrMissing { field, threshold } => match numeric_field(variant, *field) {
                Some(value) => value < *threshold,
                None => true,
            },
            Clause::Missing { field } => numeric_field(variant, *field).is_none(),
            Clause::Gt {
                field,
                threshold,
                include_missing,
            } => match numeric_field(variant, *field) {
                Some(value) => value > *threshold,
                None => *include_missing,
            },
            Clause::In { field, values } => set_field(variant, *field)
                .iter()
                .any(|value| values.contains(value)),
            Clause::AnyOf(clauses) => clauses.iter().any(|clause| clause.matches(variant)),
        }
    }
}

fn numeric_field(variant: &Variant, field: Field) -> Option<f64> {
    match field {
        Field::ThousandGenomesFrequency => variant.frequencies.get("thousand_g").copied(),
        Field::ExacFrequency => variant.frequencies.get("exac").copied(),
        Field::CaddScore => variant.cadd_score,
        _ => None,
    }
}

fn set_field(variant: &Variant, field: Field) -> Vec<String> {
    match field {
        Field::GeneticModels => variant.genetic_models.clone(),
        Field::HgncSymbols => variant.hgnc_symbols.clone(),
        Field::FunctionalAnnotations => variant
            .transcripts
            .iter()
            .flat_map(|tx| {
                tx.functional_annotations
                    .iter()
                    .map(|consequence| consequence.to_string())
            })
            .collect(),
        Field::RegionAnnotations => variant
            .transcripts
            .iter()
            .flat_map(|tx| tx.region_annotations.iter().map(|region| region.to_string()))
            .collect(),
        Field::Clnsig => variant
            .clnsig
            .iter()
            .map(|record| record.value.clone())
            .collect(),
        _ => Vec::new(),
    }
}

/// Command line arguments for the `variants query` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "filter ingested variant documents", long_about = None)]
pub struct Args {
    /// Path to the JSONL document file written by `variants ingest`.
    #[clap(long)]
    pub path_in: String,
    /// Case to query.
    #[clap(long)]
    pub case_id: String,
    /// Scope within the case.
    #[clap(long, value_enum)]
    pub variant_type: Option<VariantType>,
    /// Restrict to one category.
    #[clap(long, value_enum)]
    pub category: Option<Category>,
    /// Chromosome for positional filtering.
    #[clap(long)]
    pub chrom: Option<String>,
    /// Region start; only effective with `--chrom`.
    #[clap(long)]
    pub start: Option<i64>,
    /// Region end; only effective with `--chrom`.
    #[clap(long)]
    pub end: Option<i64>,
    /// Upper 1000 Genomes frequency bound; `-1` matches missing only.
    #[clap(long)]
    pub thousand_genomes_frequency: Option<f64>,
    /// Upper ExAC frequency bound; `-1` matches missing only.
    #[clap(long)]
    pub exac_frequency: Option<f64>,
    /// Lower CADD bound.
    #[clap(long)]
    pub cadd_score: Option<f64>,
    /// Let variants without a CADD score through the CADD filter.
    #[clap(long)]
    pub cadd_inclusive: bool,
    /// Compatible inheritance models.
    #[clap(long)]
    pub genetic_models: Vec<String>,
    /// Gene symbols.
    #[clap(long)]
    pub hgnc_symbols: Vec<String>,
    /// Consequence terms.
    #[clap(long)]
    pub functional_annotations: Vec<String>,
    /// Region labels.
    #[clap(long)]
    pub region_annotations: Vec<String>,
    /// Parsed ClinVar significance terms.
    #[clap(long)]
    pub clinsig: Vec<String>,
    /// Explicit document ids.
    #[clap(long)]
    pub variant_id: Vec<String>,
    /// Path to the output JSONL; stdout when absent.
    #[clap(long)]
    pub path_out: Option<String>,
}

/// Main entry point for the `variants query` subcommand.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    use std::io::{BufRead as _, Write as _};

    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let options = FilterOptions {
        variant_type: args.variant_type,
        chrom: args.chrom.clone(),
        start: args.start,
        end: args.end,
        thousand_genomes_frequency: args.thousand_genomes_frequency,
        exac_frequency: args.exac_frequency,
        cadd_score: args.cadd_score,
        cadd_inclusive: args.cadd_inclusive,
        genetic_models: args.genetic_models.clone(),
        hgnc_symbols: args.hgnc_symbols.clone(),
        functional_annotations: args.functional_annotations.clone(),
        region_annotations: args.region_annotations.clone(),
        clinsig: args.clinsig.clone(),
    };
    let variant_ids = if args.variant_id.is_empty() {
        None
    } else {
        Some(args.variant_id.clone())
    };
    let query = build_query(&args.case_id, &options, variant_ids, args.category);

    let file = std::fs::File::open(&args.path_in)
        .map_err(|e| anyhow::anyhow!("could not open {}: {}", &args.path_in, e))?;
    let mut matched: Vec<Variant> = Vec::new();
    let mut total = 0usize;
    for line in std::io::BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        total += 1;
        let variant: Variant = serde_json::from_str(&line)?;
        if query.matches(&variant) {
            matched.push(variant);
        }
    }
    matched.sort_by_key(|variant| variant.variant_rank.unwrap_or(i64::MAX));

    let mut writer: Box<dyn std::io::Write> = match &args.path_out {
        Some(path) => Box::new(std::io::BufWriter::new(std::fs::File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    };
    for variant in &matched {
        serde_json::to_writer(&mut writer, variant)?;
        writeln!(writer)?;
    }
    tracing::info!("{} of {} documents matched", matched.len(), total);

    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::variant::clnsig::ClnsigRecord;
    use crate::variant::csq::{Consequence, Transcript};

    fn example_variant() -> Variant {
        let mut frequencies = crate::variant::frequency::Frequencies::new();
        frequencies.insert(String::from("thousand_g"), 0.01);
        Variant {
            document_id: String::from("doc1"),
            case_id: String::from("case_1"),
            variant_type: VariantType::Clinical,
            category: Category::Snv,
            chromosome: String::from("1"),
            position: 80_000,
            end: 80_000,
            cadd_score: Some(23.5),
            frequencies,
            hgnc_symbols: vec![String::from("POC1A")],
            genetic_models: vec![String::from("AR_hom")],
            clnsig: vec![ClnsigRecord {
                value: String::from("pathogenic"),
                ..Default::default()
            }],
            transcripts: vec![Transcript {
                functional_annotations: vec![Consequence::MissenseVariant],
                region_annotations: vec![Consequence::MissenseVariant.region()],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn scope_filters() {
        let query = build_query("case_1", &FilterOptions::default(), None, None);
        assert!(query.matches(&example_variant()));

        let other_case = build_query("case_2", &FilterOptions::default(), None, None);
        assert!(!other_case.matches(&example_variant()));

        let research = build_query(
            "case_1",
            &FilterOptions {
                variant_type: Some(VariantType::Research),
                ..Default::default()
            },
            None,
            None,
        );
        assert!(!research.matches(&example_variant()));
    }

    #[test]
    fn overlap_requires_chrom() {
        let options = FilterOptions {
            // start/end without chrom are ignored
            start: Some(1),
            end: Some(2),
            ..Default::default()
        };
        let query = build_query("case_1", &options, None, None);
        assert!(query.clauses.is_empty());
        assert!(query.matches(&example_variant()));
    }

    #[rstest::rstest]
    #[case(79_000, 81_000, true)]
    #[case(80_000, 80_000, true)]
    #[case(81_000, 90_000, false)]
    fn overlap_clause(#[case] start: i64, #[case] end: i64, #[case] expected: bool) {
        let options = FilterOptions {
            chrom: Some(String::from("1")),
            start: Some(start),
            end: Some(end),
            ..Default::default()
        };
        let query = build_query("case_1", &options, None, None);
        assert_eq!(query.matches(&example_variant()), expected);
    }

    #[test]
    fn frequency_less_than_or_missing() {
        let options = FilterOptions {
            thousand_genomes_frequency: Some(0.05),
            ..Default::default()
        };
        let query = build_query("case_1", &options, None, None);
        assert!(query.matches(&example_variant()));

        let strict = FilterOptions {
            thousand_genomes_frequency: Some(0.001),
            ..Default::default()
        };
        let query = build_query("case_1", &strict, None, None);
        assert!(!query.matches(&example_variant()));

        // ExAC is absent on the example variant, so any bound passes
        let exac = FilterOptions {
            exac_frequency: Some(0.0001),
            ..Default::default()
        };
        let query = build_query("case_1", &exac, None, None);
        assert!(query.matches(&example_variant()));
    }

    #[test]
    fn frequency_missing_sentinel() {
        let options = FilterOptions {
            thousand_genomes_frequency: Some(MISSING_ONLY),
            ..Default::default()
        };
        let query = build_query("case_1", &options, None, None);
        assert!(!query.matches(&example_variant()));

        let exac = FilterOptions {
            exac_frequency: Some(MISSING_ONLY),
            ..Default::default()
        };
        let query = build_query("case_1", &exac, None, None);
        assert!(query.matches(&example_variant()));
    }

    #[test]
    fn cadd_with_and_without_missing() {
        let query = build_query(
            "case_1",
            &FilterOptions {
                cadd_score: Some(20.0),
                ..Default::default()
            },
            None,
            None,
        );
        assert!(query.matches(&example_variant()));

        let mut variant = example_variant();
        variant.cadd_score = None;
        assert!(!query.matches(&variant));

        let inclusive = build_query(
            "case_1",
            &FilterOptions {
                cadd_score: Some(20.0),
                cadd_inclusive: true,
                ..Default::default()
            },
            None,
            None,
        );
        assert!(inclusive.matches(&variant));
    }

    #[rstest::rstest]
    #[case(FilterOptions { hgnc_symbols: vec![String::from("POC1A")], ..Default::default() }, true)]
    #[case(FilterOptions { hgnc_symbols: vec![String::from("BRCA1")], ..Default::default() }, false)]
    #[case(FilterOptions { genetic_models: vec![String::from("AR_hom")], ..Default::default() }, true)]
    #[case(FilterOptions { functional_annotations: vec![String::from("missense_variant")], ..Default::default() }, true)]
    #[case(FilterOptions { region_annotations: vec![String::from("exonic")], ..Default::default() }, true)]
    #[case(FilterOptions { region_annotations: vec![String::from("intronic")], ..Default::default() }, false)]
    #[case(FilterOptions { clinsig: vec![String::from("pathogenic")], ..Default::default() }, true)]
    fn membership_clauses(#[case] options: FilterOptions, #[case] expected: bool) {
        let query = build_query("case_1", &options, None, None);
        assert_eq!(query.matches(&example_variant()), expected);
    }

    #[test]
    fn explicit_variant_ids() {
        let query = build_query(
            "case_1",
            &FilterOptions::default(),
            Some(vec![String::from("doc1")]),
            None,
        );
        assert!(query.matches(&example_variant()));

        let query = build_query(
            "case_1",
            &FilterOptions::default(),
            Some(vec![String::from("other")]),
            None,
        );
        assert!(!query.matches(&example_variant()));
    }

    #[test]
    fn any_of_group() {
        let clause = Clause::AnyOf(vec![
            Clause::Missing {
                field: Field::CaddScore,
            },
            Clause::Gt {
                field: Field::CaddScore,
                threshold: 20.0,
                include_missing: false,
            },
        ]);
        assert!(clause.matches(&example_variant()));
    }
}
