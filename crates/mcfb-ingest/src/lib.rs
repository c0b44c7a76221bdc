//! File ingestion for the MCF browser.
//!
//! Two text formats feed the session graph:
//!
//! - **MCF** (`.mcf`): line-oriented triples, parsed directly by
//!   [`mcf::McfParser`].
//! - **TMCF + CSV** (`.tmcf` paired with a `.csv`): a template with
//!   per-row placeholders, expanded by [`tmcf::TmcfExpander`] into plain MCF
//!   and then fed through the same parser.
//!
//! The [`series`] module additionally extracts StatVarObservation time
//! series from TMCF+CSV pairs without going through the graph.

pub mod mcf;
pub mod series;
pub mod tmcf;
