//! Reference catalogs: genes, transcripts, HPO terms, diseases, cytobands.

pub mod build;
pub mod cytoband;
pub mod diseases;
pub mod genes;
pub mod hpo;
pub mod omim;
