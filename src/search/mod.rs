//! Rename-candidate aggregation engine.
//!
//! # Architecture
//! - [`ConstituentSearcher`]: one reference search group (base symbol or overloads)
//! - [`AggregationContainer`]: merges constituents and text scans into a [`ResultSet`]
//! - [`RenameLocationFinder`]: `find_all` / `refine`, reusing prior work when only options change
//!
//! # Key Concepts
//! - **Constituent**: an independently searched symbol group
//! - **Generation**: one text-scan option combination of a container; resetting it re-arms the promises
//! - **Implicit location**: a reference without literal source text

mod accumulator;
mod collaborators;
mod constituent;
mod container;
mod result;
mod reuse;
#[cfg(test)]
mod testing;

pub use collaborators::{
    LocationResolver, ReferenceFinder, ReferenceSink, RenameServices, SymbolTable, TextScanner,
};
pub use constituent::{ConstituentKind, ConstituentPhase, ConstituentSearcher};
pub use container::{AggregationContainer, ContainerPhase, SearchProgress};
pub use result::{ResultReport, ResultSet};
pub use reuse::{RenameLocationFinder, RenameSearch};
