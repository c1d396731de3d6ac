//! Git history analysis: hotspots, directory rollups, and bus factor.
//!
//! Mines git history using git2 into a flat commit table, then scores files
//! by change frequency, size, and age to surface hotspots, rolls changes up
//! by directory, and flags hotspots maintained by a single recent author.

pub mod aggregate;
pub mod analysis;
pub mod hotspots;
pub mod mining;
pub mod ownership;
pub mod paths;
pub mod rollup;
pub mod sizes;
