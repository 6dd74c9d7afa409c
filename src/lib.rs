//! Library code of the scout-server variant ingestion worker.

pub mod case;
pub mod catalog;
pub mod common;
pub mod load;
pub mod query;
pub mod store;
pub mod variant;
