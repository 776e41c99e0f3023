//! Offline answer-quality check against a running service.
//!
//! Each fixed question goes to the chat endpoint. The answer is embedded with the service's own
//! embedder and scored by cosine similarity against every curated fact. The closest fact and its
//! score end up in a CSV report.

use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use finrag_core::{Embedding, EmbeddingModel};
use finrag_ort::OrtEmbedding;
use finrag_sources::curated_facts;
use serde::Serialize;

use crate::config::EvaluateArgs;
use crate::routes::ChatRequest;

/// Questions asked during evaluation, in report order.
pub const TEST_QUESTIONS: [&str; 10] = [
    "What are the risks of investing in Bitcoin?",
    "Tell me about the interest rate set by the Federal Reserve.",
    "What is the current trend in Edmonton\u{2019}s housing market?",
    "Can I invest in mutual funds for retirement?",
    "How does inflation affect my savings?",
    "What role does ATB Financial play in Alberta\u{2019}s economy?",
    "Are ETFs a safe investment?",
    "What\u{2019}s the TSX and what type of companies are listed?",
    "How much can I contribute to my RRSP in 2025?",
    "What initiatives support financial innovation in Edmonton?",
];

const ASK_TIMEOUT: Duration = Duration::from_secs(60);

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalRecord {
    /// Question asked.
    #[serde(rename = "Question")]
    pub question: String,
    /// Answer text, or `Error: ...` if the request failed.
    #[serde(rename = "Chatbot Response")]
    pub response: String,
    /// Curated fact closest to the answer.
    #[serde(rename = "Best Match")]
    pub best_match: String,
    /// Cosine similarity to the best match, rounded to four places.
    #[serde(rename = "Similarity")]
    pub similarity: f64,
}

/// Cosine similarity of two vectors. Zero if either has zero length.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Index and score of the candidate most similar to `target`. The first wins on ties.
#[must_use]
pub fn best_match(target: &[f32], candidates: &[Embedding]) -> Option<(usize, f32)> {
    candidates
        .iter()
        .map(|candidate| cosine_similarity(target, candidate))
        .enumerate()
        .fold(None, |best, (i, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((i, score)),
        })
}

fn round4(value: f32) -> f64 {
    (f64::from(value) * 10_000.0).round() / 10_000.0
}

/// Posts one question. Failures become an `Error: ...` answer instead of aborting the run.
pub async fn ask(http: &reqwest::Client, url: &str, question: &str) -> String {
    let result = async {
        let body: serde_json::Value = http
            .post(url)
            .timeout(ASK_TIMEOUT)
            .json(&ChatRequest {
                query: question.to_owned(),
            })
            .send()
            .await?
            .json()
            .await?;
        Ok::<_, reqwest::Error>(body)
    }
    .await;

    match result {
        Ok(body) => body
            .get("response")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        Err(error) => format!("Error: {error}"),
    }
}

/// Asks every question and scores the answers against `facts`.
///
/// # Errors
/// Fails only if the embedder fails; request failures are recorded in the report.
pub async fn evaluate<M: EmbeddingModel>(
    embedder: &M,
    http: &reqwest::Client,
    url: &str,
    questions: &[&str],
    facts: &[&str],
) -> finrag_core::Result<Vec<EvalRecord>> {
    let fact_texts: Vec<String> = facts.iter().map(|&fact| fact.to_owned()).collect();
    let fact_vectors = embedder.embed_batch(&fact_texts).await?;

    let mut records = Vec::with_capacity(questions.len());
    for &question in questions {
        let response = ask(http, url, question).await;
        let vector = embedder.embed(&response).await?;
        let (index, score) = best_match(&vector, &fact_vectors).unwrap_or((0, 0.0));

        tracing::info!(question, similarity = score, "Scored answer");
        records.push(EvalRecord {
            question: question.to_owned(),
            response,
            best_match: fact_texts.get(index).cloned().unwrap_or_default(),
            similarity: round4(score),
        });
    }

    Ok(records)
}

/// Mean similarity, rounded to four places. Zero for an empty report.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_similarity(records: &[EvalRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let mean = records.iter().map(|r| r.similarity).sum::<f64>() / records.len() as f64;
    (mean * 10_000.0).round() / 10_000.0
}

/// Writes the report as CSV with a header row.
///
/// # Errors
/// Fails if a row cannot be written.
pub fn write_csv<W: io::Write>(writer: W, records: &[EvalRecord]) -> csv::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}

/// Runs `finrag evaluate`.
///
/// # Errors
/// Fails if the embedder cannot be loaded or the report cannot be written.
pub async fn run(args: EvaluateArgs) -> anyhow::Result<()> {
    let embedder = OrtEmbedding::from_directory(&args.model_dir)
        .with_context(|| format!("loading embedder from {}", args.model_dir.display()))?;
    let http = reqwest::Client::new();

    let records = evaluate(&embedder, &http, &args.url, &TEST_QUESTIONS, curated_facts()).await?;

    for (i, record) in records.iter().enumerate() {
        println!("Q{}: {:.4}  {}", i + 1, record.similarity, record.question);
    }
    println!("Average similarity: {:.4}", average_similarity(&records));

    save(&args.output, &records)?;
    println!("Saved results to {}", args.output.display());
    Ok(())
}

fn save(path: &Path, records: &[EvalRecord]) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_csv(file, records).with_context(|| format!("writing {}", path.display()))
}
