//! scout-worker main executable.

use clap::{Args as ClapArgs, Parser, Subcommand};

use scout_worker::{catalog, common, load, query, variant};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Variant ingestion worker for scout-server",
    long_about = "This tool parses annotated VCFs and catalog files into scout-server documents"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Subcommand)]
enum Commands {
    /// Catalog-related commands.
    Catalog(Catalog),
    /// Variant-related commands.
    Variants(Variants),
    /// RNA outlier related commands.
    Omics(Omics),
}

/// Parsing of "catalog *" sub commands.
#[derive(Debug, ClapArgs)]
#[command(args_conflicts_with_subcommands = true)]
struct Catalog {
    /// The sub command to run
    #[command(subcommand)]
    command: CatalogCommands,
}

/// Enum supporting the parsing of "catalog *" sub commands.
#[derive(Debug, Subcommand)]
enum CatalogCommands {
    Genes(catalog::build::GenesArgs),
    Hpo(catalog::build::HpoArgs),
    Diseases(catalog::build::DiseasesArgs),
}

/// Parsing of "variants *" sub commands.
#[derive(Debug, ClapArgs)]
#[command(args_conflicts_with_subcommands = true)]
struct Variants {
    /// The sub command to run
    #[command(subcommand)]
    command: VariantsCommands,
}

/// Enum supporting the parsing of "variants *" sub commands.
#[derive(Debug, Subcommand)]
enum VariantsCommands {
    Ingest(load::Args),
    Query(query::Args),
}

/// Parsing of "omics *" sub commands.
#[derive(Debug, ClapArgs)]
#[command(args_conflicts_with_subcommands = true)]
struct Omics {
    /// The sub command to run
    #[command(subcommand)]
    command: OmicsCommands,
}

/// Enum supporting the parsing of "omics *" sub commands.
#[derive(Debug, Subcommand)]
enum OmicsCommands {
    Ingest(variant::omics::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Catalog(catalog_cmd) => match &catalog_cmd.command {
                CatalogCommands::Genes(args) => {
                    catalog::build::run_genes(&cli.common, args)?;
                }
                CatalogCommands::Hpo(args) => {
                    catalog::build::run_hpo(&cli.common, args)?;
                }
                CatalogCommands::Diseases(args) => {
                    catalog::build::run_diseases(&cli.common, args)?;
                }
            },
            Commands::Variants(variants) => match &variants.command {
                VariantsCommands::Ingest(args) => {
                    load::run(&cli.common, args)?;
                }
                VariantsCommands::Query(args) => {
                    query::run(&cli.common, args)?;
                }
            },
            Commands::Omics(omics) => match &omics.command {
                OmicsCommands::Ingest(args) => {
                    variant::omics::run(&cli.common, args)?;
                }
            },
        }

        Ok::<(), anyhow::Error>(())
    })?;
    tracing::info!("All done. Have a nice day!");

    Ok(())
}
