pub(crate) mod def;
pub(crate) mod file;
pub(crate) mod list;
pub(crate) mod factor;

mod btran;
mod dfs;
mod eta;
mod ftran;
mod lower;
mod stats;
mod update;
mod upper;
mod workspace;


pub use def::{FtranUpdate, ReplaceStatus, Tier};
pub use factor::Factorization;
pub use stats::{DensityEstimates, Statistics};
pub use workspace::SolveWorkspace;
