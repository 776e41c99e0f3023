//! Knowledge for the finrag corpus.
//!
//! Two kinds of input feed the corpus:
//!
//! | Kind | Item | Refreshed |
//! |------|------|-----------|
//! | Curated | [`curated_facts`] | never, compiled in |
//! | Dynamic | [`OpenDataSource`] per [`Dataset`] | once per start-up |
//!
//! ```no_run
//! use finrag_rag::CorpusBuilder;
//! use finrag_sources::{OpenDataConfig, curated_facts, edmonton_sources};
//!
//! # async fn demo() {
//! let corpus = CorpusBuilder::new(curated_facts().iter().copied())
//!     .sources(edmonton_sources(&OpenDataConfig::default()))
//!     .build()
//!     .await;
//! assert!(corpus.len() >= curated_facts().len());
//! # }
//! ```

mod curated;
mod error;
pub mod opendata;

pub use curated::curated_facts;
pub use error::SourceError;
pub use opendata::{Dataset, EDMONTON_DATASETS, OpenDataConfig, OpenDataSource, edmonton_sources};
