//! # rankdb: a top-K ranking database
//!
//! rankdb indexes records of named numeric fields and answers queries that rank
//! every record by an arithmetic scoring expression over those fields, returning
//! the best `K`. It is built for a corpus that is queried with many different
//! weightings rather than for text retrieval.
//!
//! ```
//! use rankdb::{DbOptions, Query, Record};
//!
//! let mut db = DbOptions::default().open().unwrap();
//! let record = |age: f32, height: f32| {
//!     Record::from([("age".to_string(), age), ("height".to_string(), height)])
//! };
//! let ids = db
//!     .bulk_index(&[record(32.0, 2.0), record(25.0, 1.5), record(16.0, 2.5)])
//!     .unwrap();
//!
//! let query: Query = serde_json::from_str(
//!     r#"{"limit": 2, "scorer": ["sum", ["field", "age"], ["field", "height"]]}"#,
//! )
//! .unwrap();
//! assert_eq!(db.query(&query).unwrap().ids(), vec![ids[0], ids[1]]);
//! ```
//!
//! ## Crates
//!
//! * [`common`] - error taxonomy and result helpers
//! * [`scoring`] - the score iterator contract and its combinators
//! * [`postings`] - on-disk bucketed posting lists
//! * [`query`] - scorer expressions, compilation and the top-K engine
//! * [`sharding`] - shard id packing and the parallel merge
//!
//! This crate adds the storage backends ([`MemoryBackend`], [`FsBackend`]),
//! [`DbOptions`] and the client id boundary ([`ClientDb`]).

pub mod client;
pub mod fs;
pub mod memory;
pub mod options;

pub use rankdb_common as common;
pub use rankdb_postings as postings;
pub use rankdb_query as query;
pub use rankdb_scoring as scoring;
pub use rankdb_sharding as sharding;

pub use client::{ClientDb, ClientHit, IdMap, MemoryIdMap};
pub use fs::FsBackend;
pub use memory::MemoryBackend;
pub use options::{Db, DbOptions};
pub use rankdb_common::{Error, ErrorKind, Result};
pub use rankdb_query::{
    BackendDb, DocScore, Query, QueryResult, Record, ScoreDb, ScorerExpr, StreamingDb,
};
pub use rankdb_scoring::{DocId, DocItr};
