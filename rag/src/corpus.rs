//! Corpus assembly from curated passages and dynamic knowledge sources.
//!
//! A [`KnowledgeSource`] produces one block of text when asked. The [`CorpusBuilder`] runs every
//! registered source concurrently, keeps the successful blocks in registration order, and logs
//! the rest. A source that errors, panics, or outlives the fetch timeout is left out; the service
//! still starts.
//!
//! ```rust
//! use finrag_rag::{CorpusBuilder, KnowledgeSource};
//!
//! struct Rates;
//!
//! impl KnowledgeSource for Rates {
//!     fn label(&self) -> &str {
//!         "Interest Rates"
//!     }
//!
//!     async fn fetch(&self) -> finrag_core::Result<String> {
//!         Ok("Prime: 5.2%".to_owned())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let corpus = CorpusBuilder::new(["Bonds pay interest."]).source(Rates).build().await;
//! assert_eq!(corpus.texts(), ["Bonds pay interest.", "Interest Rates: \nPrime: 5.2%"]);
//! # });
//! ```

use std::any::Any;
use std::fmt::{self, Debug};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::time::Duration;

use async_io::Timer;
use futures::FutureExt;
use futures::future::{Either, join_all, select};

use crate::types::{Corpus, Passage};

/// A dynamic knowledge lookup evaluated once at start-up.
pub trait KnowledgeSource: Send + Sync {
    /// Human-readable label. It prefixes the passage text.
    fn label(&self) -> &str;

    /// Fetches the current body text.
    ///
    /// The builder bounds every call with its fetch timeout, see
    /// [`CorpusBuilder::fetch_timeout`].
    fn fetch(&self) -> impl Future<Output = finrag_core::Result<String>> + Send;
}

trait SourceImpl: Send + Sync {
    fn label(&self) -> &str;
    fn fetch(&self) -> Pin<Box<dyn Future<Output = finrag_core::Result<String>> + Send + '_>>;
}

impl<T: KnowledgeSource> SourceImpl for T {
    fn label(&self) -> &str {
        KnowledgeSource::label(self)
    }

    fn fetch(&self) -> Pin<Box<dyn Future<Output = finrag_core::Result<String>> + Send + '_>> {
        Box::pin(KnowledgeSource::fetch(self))
    }
}

/// Outcome of one source during corpus construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceReport {
    /// The source produced a passage.
    Included {
        /// Source label.
        label: String,
    },
    /// The source failed and was left out.
    Failed {
        /// Source label.
        label: String,
        /// Rendered error chain.
        reason: String,
    },
}

impl SourceReport {
    /// Label of the source this report is about.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Included { label } | Self::Failed { label, .. } => label,
        }
    }

    /// Whether the source made it into the corpus.
    #[must_use]
    pub const fn is_included(&self) -> bool {
        matches!(self, Self::Included { .. })
    }
}

/// Formats a dynamic block the way it is stored in the corpus.
#[must_use]
pub fn format_block(label: &str, body: &str) -> String {
    format!("{label}: \n{body}")
}

/// Default upper bound on a single source fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds a [`Corpus`]: curated passages first, then one passage per successful source.
pub struct CorpusBuilder {
    curated: Vec<String>,
    sources: Vec<Box<dyn SourceImpl>>,
    fetch_timeout: Duration,
}

impl Debug for CorpusBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorpusBuilder")
            .field("curated", &self.curated.len())
            .field("fetch_timeout", &self.fetch_timeout)
            .field(
                "sources",
                &self.sources.iter().map(|s| s.label()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl CorpusBuilder {
    /// Starts from a curated list, in order.
    pub fn new<I, S>(curated: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            curated: curated.into_iter().map(Into::into).collect(),
            sources: Vec::new(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Caps how long any one source may take before it is reported as failed.
    #[must_use]
    pub const fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Registers a dynamic source. Registration order is corpus order.
    #[must_use]
    pub fn source(mut self, source: impl KnowledgeSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Registers several dynamic sources in iteration order.
    #[must_use]
    pub fn sources<S: KnowledgeSource + 'static>(
        mut self,
        sources: impl IntoIterator<Item = S>,
    ) -> Self {
        self.sources.extend(
            sources
                .into_iter()
                .map(|source| Box::new(source) as Box<dyn SourceImpl>),
        );
        self
    }

    /// Fetches all sources and assembles the corpus.
    pub async fn build(self) -> Corpus {
        self.build_with_report().await.0
    }

    /// Like [`build`](Self::build), but also reports what happened to each source.
    pub async fn build_with_report(self) -> (Corpus, Vec<SourceReport>) {
        let limit = self.fetch_timeout;
        let outcomes = join_all(
            self.sources
                .iter()
                .map(|source| guarded_fetch(source.as_ref(), limit)),
        )
        .await;

        let mut passages: Vec<Passage> = self.curated.into_iter().map(Passage::curated).collect();
        let mut reports = Vec::with_capacity(self.sources.len());

        for (source, outcome) in self.sources.iter().zip(outcomes) {
            let label = source.label().to_owned();
            match outcome {
                Ok(body) => {
                    tracing::info!(source = %label, bytes = body.len(), "Fetched knowledge source");
                    passages.push(Passage::from_source(&label, format_block(&label, &body)));
                    reports.push(SourceReport::Included { label });
                }
                Err(reason) => {
                    tracing::error!(source = %label, error = %reason, "Failed to fetch knowledge source");
                    reports.push(SourceReport::Failed { label, reason });
                }
            }
        }

        (Corpus::new(passages), reports)
    }
}

/// Runs one fetch, turning errors, panics and overruns into a failure reason.
async fn guarded_fetch(source: &dyn SourceImpl, limit: Duration) -> Result<String, String> {
    let fetch = AssertUnwindSafe(async move { source.fetch().await }).catch_unwind();
    futures::pin_mut!(fetch);

    match select(fetch, Timer::after(limit)).await {
        Either::Left((Ok(Ok(body)), _)) => Ok(body),
        Either::Left((Ok(Err(error)), _)) => Err(format!("{error:#}")),
        Either::Left((Err(payload), _)) => Err(format!("panicked: {}", panic_message(&*payload))),
        Either::Right(_) => Err(format!("timed out after {limit:?}")),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
