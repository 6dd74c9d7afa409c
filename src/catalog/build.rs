//! CLI subcommands that build the catalog JSON files.

use crate::catalog::cytoband::CytobandIndex;
use crate::catalog::genes::{self, GeneIndex};
use crate::catalog::hpo;
use crate::catalog::omim;
use crate::catalog::{diseases, diseases::orpha};
use crate::common::GenomeBuild;

fn write_json<T: serde::Serialize>(value: &T, path: &str) -> Result<(), anyhow::Error> {
    let file = std::fs::File::create(path)
        .map_err(|e| anyhow::anyhow!("could not create {}: {}", path, e))?;
    serde_json::to_writer(std::io::BufWriter::new(file), value)?;
    Ok(())
}

fn read_gene_index(path: &str) -> Result<GeneIndex, anyhow::Error> {
    let file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("could not open gene index {}: {}", path, e))?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

/// Command line arguments for `catalog genes`.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "build the gene index", long_about = None)]
pub struct GenesArgs {
    /// The genome build of the coordinate columns.
    #[clap(long, value_enum, default_value_t = GenomeBuild::Build37)]
    pub genome_build: GenomeBuild,
    /// Path to `hgnc_complete_set.txt`.
    #[clap(long)]
    pub path_hgnc: String,
    /// Path to the Ensembl BioMart gene TSV.
    #[clap(long)]
    pub path_ensembl_genes: String,
    /// Path to the Ensembl BioMart transcript TSV.
    #[clap(long)]
    pub path_ensembl_transcripts: Option<String>,
    /// Path to the gnomAD constraint TSV.
    #[clap(long)]
    pub path_constraint: Option<String>,
    /// Path to the OMIM `genemap2.txt` file.
    #[clap(long)]
    pub path_genemap: Option<String>,
    /// Path to the cytoband TSV, used to back-fill coordinates.
    #[clap(long)]
    pub path_cytobands: Option<String>,
    /// Path to the output JSON.
    #[clap(long)]
    pub path_out: String,
}

/// Main entry point for the `catalog genes` subcommand.
pub fn run_genes(args_common: &crate::common::Args, args: &GenesArgs) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let hgnc_entries = genes::hgnc::load_entries(&args.path_hgnc)?;
    let ensembl_entries = genes::ensembl_genes::load_entries(&args.path_ensembl_genes)?;
    let constraint_entries = match &args.path_constraint {
        Some(path) => genes::constraint::load_entries(path)?,
        None => Vec::new(),
    };
    let omim_genes = args
        .path_genemap
        .as_ref()
        .map(|path| -> Result<_, anyhow::Error> {
            let entries = omim::load_genemap(path)?;
            Ok(omim::build_gene_map(&entries))
        })
        .transpose()?;
    let cytobands = args
        .path_cytobands
        .as_ref()
        .map(CytobandIndex::from_path)
        .transpose()?;

    let mut index = genes::build_gene_index(
        args.genome_build,
        hgnc_entries,
        ensembl_entries,
        constraint_entries,
        omim_genes.as_ref(),
        cytobands.as_ref(),
    )?;
    if let Some(path) = &args.path_ensembl_transcripts {
        genes::attach_transcripts(&mut index, genes::ensembl_transcripts::load_entries(path)?);
    }

    tracing::info!(
        "built index with {} genes and {} transcripts",
        index.genes.len(),
        index.transcripts.len()
    );
    write_json(&index, &args.path_out)
}

/// Command line arguments for `catalog hpo`.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "build the HPO term index", long_about = None)]
pub struct HpoArgs {
    /// Path to `hpo.obo`.
    #[clap(long)]
    pub path_obo: String,
    /// Path to `phenotype_to_genes.txt` for gene associations.
    #[clap(long)]
    pub path_phenotype_to_genes: Option<String>,
    /// Path to the gene index JSON built by `catalog genes`.
    #[clap(long)]
    pub path_genes: Option<String>,
    /// Path to the output JSON.
    #[clap(long)]
    pub path_out: String,
}

/// Main entry point for the `catalog hpo` subcommand.
pub fn run_hpo(args_common: &crate::common::Args, args: &HpoArgs) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let mut index = hpo::build_hpo_index(hpo::load_obo(&args.path_obo)?);
    if let (Some(path_associations), Some(path_genes)) =
        (&args.path_phenotype_to_genes, &args.path_genes)
    {
        let entries = hpo::phenotype_to_genes::load_entries(path_associations)?;
        let gene_index = read_gene_index(path_genes)?;
        hpo::associate_genes(&mut index, &entries, &gene_index);
    }

    tracing::info!("built index with {} terms", index.terms.len());
    write_json(&index, &args.path_out)
}

/// Command line arguments for `catalog diseases`.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "build the disease term index", long_about = None)]
pub struct DiseasesArgs {
    /// Path to the OMIM `genemap2.txt` file.
    #[clap(long)]
    pub path_genemap: Option<String>,
    /// Path to `phenotype.hpoa`.
    #[clap(long)]
    pub path_hpoa: Option<String>,
    /// Path to the gene index JSON, required for OMIM symbol resolution.
    #[clap(long)]
    pub path_genes: Option<String>,
    /// Path to the Orphanet `en_product6.xml` gene file.
    #[clap(long)]
    pub path_orpha_genes: Option<String>,
    /// Path to the Orphanet `en_product4.xml` HPO file.
    #[clap(long)]
    pub path_orpha_hpo: Option<String>,
    /// Path to the Orphanet `en_product9_ages.xml` inheritance file.
    #[clap(long)]
    pub path_orpha_inheritance: Option<String>,
    /// Path to the output JSON.
    #[clap(long)]
    pub path_out: String,
}

/// Main entry point for the `catalog diseases` subcommand.
pub fn run_diseases(
    args_common: &crate::common::Args,
    args: &DiseasesArgs,
) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let mut sources = Vec::new();

    if let (Some(path_genemap), Some(path_hpoa), Some(path_genes)) =
        (&args.path_genemap, &args.path_hpoa, &args.path_genes)
    {
        let genemap_entries = omim::load_genemap(path_genemap)?;
        let hpoa_entries = diseases::hpoa::load_entries(path_hpoa)?;
        let gene_index = read_gene_index(path_genes)?;
        sources.push(diseases::from_omim(
            &genemap_entries,
            &hpoa_entries,
            &gene_index,
        ));
    }

    let load_optional = |path: &Option<String>| -> Result<_, anyhow::Error> {
        match path {
            Some(path) => orpha::load_product(path),
            None => Ok(Default::default()),
        }
    };
    let orpha_genes = load_optional(&args.path_orpha_genes)?;
    let orpha_hpo = load_optional(&args.path_orpha_hpo)?;
    let orpha_inheritance = load_optional(&args.path_orpha_inheritance)?;
    if !orpha_genes.is_empty() || !orpha_hpo.is_empty() {
        sources.push(diseases::from_orpha(
            &orpha_genes,
            &orpha_hpo,
            &orpha_inheritance,
        ));
    }

    let index = diseases::merge_diseases(sources);
    tracing::info!("built index with {} disease terms", index.terms.len());
    write_json(&index, &args.path_out)
}
