//! Stateless analytics over codes and codings.
//!
//! Every function here is pure and recomputes from its inputs. Empty input
//! yields empty output, never an error.

pub mod cache;
pub mod cooccurrence;
pub mod frequency;
pub mod heatmap;
