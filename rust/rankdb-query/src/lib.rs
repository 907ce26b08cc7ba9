//! Query front end of rankdb: scorer expressions, their compilation into score
//! iterator trees, and the top-K engine that drains those trees.

pub mod compile;
pub mod db;
pub mod expr;
pub mod top_k;

pub use compile::{FieldSource, compile};
pub use db::{BackendDb, IndexBackend, Query, QueryResult, Record, ScoreDb, StreamingDb};
pub use expr::ScorerExpr;
pub use top_k::{DocScore, top_k};
