//! Sparse LU factors of a simplex basis with in-place column replacement.
//!
//! A [`Factorization`] is set up once from triangular factors of the basis
//! and then answers forward ([`ftran`](Factorization::ftran)) and transposed
//! ([`btran`](Factorization::btran)) solves while basis columns are replaced
//! one at a time ([`replace_column`](Factorization::replace_column)). The
//! replaced rows are eliminated with row etas in the Forrest-Tomlin manner,
//! so L stays static and U stays triangular until the caller refactorizes.
//!
//! All vectors passed in and out are [`IndexedVector`]s: a dense array plus
//! the list of its nonzero positions.

mod columns;
mod error;
mod indexed;
mod settings;

mod factor;

pub use columns::SparseColumns;
pub use error::FactorError;
pub use factor::{
    DensityEstimates, Factorization, FtranUpdate, ReplaceStatus, SolveWorkspace, Statistics, Tier,
};
pub use indexed::{IndexedVector, TINY_ELEMENT};
pub use settings::{FactorSettings, FactorSettingsBuilder, FactorSettingsBuilderError, SettingsError};
