//! City of Edmonton open-data lookups.
//!
//! Each [`Dataset`] names a Socrata resource and how one record reads as a line of text. An
//! [`OpenDataSource`] fetches a handful of records and joins the lines into one knowledge block.
//!
//! ```no_run
//! use finrag_rag::KnowledgeSource;
//! use finrag_sources::{EDMONTON_DATASETS, OpenDataConfig, OpenDataSource};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let source = OpenDataSource::new(EDMONTON_DATASETS[0], &OpenDataConfig::default());
//! println!("{}", source.fetch().await?);
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::time::Duration;

use finrag_rag::KnowledgeSource;
use reqwest::header;
use serde_json::{Map, Value};

use crate::SourceError;

/// One record of a dataset response.
pub type Record = Map<String, Value>;

const MISSING: &str = "N/A";
const USER_AGENT: &str = concat!("finrag-sources/", env!("CARGO_PKG_VERSION"));

/// A Socrata dataset and its line template.
#[derive(Clone, Copy)]
pub struct Dataset {
    /// Resource identifier, e.g. `q7d6-ambg`.
    pub id: &'static str,
    /// Label prefixed to the knowledge block.
    pub label: &'static str,
    render: fn(&Record) -> String,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl Dataset {
    /// Renders one record. Missing fields read as `N/A`.
    #[must_use]
    pub fn render(&self, record: &Record) -> String {
        (self.render)(record)
    }
}

/// The five Edmonton datasets, in corpus order.
pub const EDMONTON_DATASETS: [Dataset; 5] = [
    Dataset {
        id: "q7d6-ambg",
        label: "Recent Edmonton Property Assessments",
        render: |r| {
            format!(
                "Address: {}, Assessed Value: ${}",
                field(r, "address"),
                field(r, "assessed_value")
            )
        },
    },
    Dataset {
        id: "whar-nsyh",
        label: "Affordable Housing Availability",
        render: |r| {
            format!(
                "Neighbourhood: {}, Type: {}, Units: {}",
                field(r, "neighbourhood"),
                field(r, "type_of_housing"),
                field(r, "number_of_units")
            )
        },
    },
    Dataset {
        id: "ihuy-w3s8",
        label: "Senior Management Expenses",
        render: |r| {
            format!(
                "{} spent ${} on {} in {}",
                field(r, "employee_name"),
                field(r, "amount"),
                field(r, "expense_category"),
                field(r, "year")
            )
        },
    },
    Dataset {
        id: "2crc-aced",
        label: "Household Spending Trends",
        render: |r| {
            format!(
                "{}: Average Spend = ${}",
                field(r, "category"),
                field(r, "average_spend")
            )
        },
    },
    Dataset {
        id: "87u8-3yfv",
        label: "Tax Perception Insights",
        render: |r| {
            format!(
                "{}: {} ({}%)",
                field(r, "statement"),
                field(r, "response"),
                field(r, "percentage")
            )
        },
    },
];

fn field<'a>(record: &'a Record, key: &str) -> Cow<'a, str> {
    match record.get(key) {
        Some(Value::String(s)) => Cow::Borrowed(s),
        Some(Value::Number(n)) => Cow::Owned(n.to_string()),
        Some(Value::Bool(true)) => Cow::Borrowed("True"),
        Some(Value::Bool(false)) => Cow::Borrowed("False"),
        _ => Cow::Borrowed(MISSING),
    }
}

/// Where and how much to fetch.
#[derive(Debug, Clone)]
pub struct OpenDataConfig {
    /// Portal root, without a trailing slash.
    pub base_url: String,
    /// Records requested per dataset.
    pub limit: u32,
    /// Whole-request timeout per dataset.
    pub timeout: Duration,
}

impl Default for OpenDataConfig {
    fn default() -> Self {
        Self {
            base_url: "https://data.edmonton.ca".to_owned(),
            limit: 5,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Fetches one dataset as a knowledge block.
#[derive(Debug, Clone)]
pub struct OpenDataSource {
    dataset: Dataset,
    url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl OpenDataSource {
    /// Creates a source with its own HTTP client.
    #[must_use]
    pub fn new(dataset: Dataset, config: &OpenDataConfig) -> Self {
        Self::with_client(dataset, config, reqwest::Client::new())
    }

    /// Creates a source reusing `http`.
    #[must_use]
    pub fn with_client(dataset: Dataset, config: &OpenDataConfig, http: reqwest::Client) -> Self {
        let url = format!(
            "{}/resource/{}.json?$limit={}",
            config.base_url.trim_end_matches('/'),
            dataset.id,
            config.limit
        );
        Self {
            dataset,
            url,
            timeout: config.timeout,
            http,
        }
    }

    /// The dataset this source reads.
    #[must_use]
    pub const fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Full request URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches and renders the records, one line each.
    ///
    /// # Errors
    /// Fails on transport errors, timeouts, non-success statuses, and bodies that are not a JSON
    /// array of objects.
    pub async fn fetch_block(&self) -> Result<String, SourceError> {
        tracing::debug!(dataset = self.dataset.id, url = %self.url, "Fetching open-data records");

        let response = self
            .http
            .get(&self.url)
            .timeout(self.timeout)
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let records = parse_records(&body)?;

        Ok(records
            .iter()
            .map(|record| self.dataset.render(record))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

fn parse_records(body: &str) -> Result<Vec<Record>, SourceError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    let Value::Array(items) = value else {
        return Err(SourceError::Malformed("expected a JSON array".to_owned()));
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(record) => Ok(record),
            other => Err(SourceError::Malformed(format!(
                "expected an object record, got {other}"
            ))),
        })
        .collect()
}

impl KnowledgeSource for OpenDataSource {
    fn label(&self) -> &str {
        self.dataset.label
    }

    async fn fetch(&self) -> finrag_core::Result<String> {
        Ok(self.fetch_block().await?)
    }
}

/// One source per Edmonton dataset, in corpus order, sharing a single HTTP client.
#[must_use]
pub fn edmonton_sources(config: &OpenDataConfig) -> Vec<OpenDataSource> {
    let http = reqwest::Client::new();
    EDMONTON_DATASETS
        .iter()
        .map(|dataset| OpenDataSource::with_client(*dataset, config, http.clone()))
        .collect()
}
