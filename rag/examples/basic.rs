//! Basic retrieval flow using a toy embedder and a stub language model.

use finrag_core::{EmbeddingModel, LanguageModel, Result, llm::LLMRequest};
use finrag_rag::{AnswerGenerator, CorpusBuilder, KnowledgeSource, Retriever};

#[derive(Clone)]
struct DemoEmbedder;

impl EmbeddingModel for DemoEmbedder {
    fn dim(&self) -> usize {
        4
    }

    #[allow(clippy::cast_precision_loss)]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; self.dim()];
        for (idx, byte) in text.bytes().enumerate() {
            let bucket = idx % self.dim();
            vector[bucket] += f32::from(byte);
        }
        Ok(vector)
    }
}

struct Rates;

impl KnowledgeSource for Rates {
    fn label(&self) -> &str {
        "Interest Rates"
    }

    async fn fetch(&self) -> Result<String> {
        Ok("Prime rate: 5.2%".to_owned())
    }
}

/// Echoes the size of the prompt instead of calling a real model.
struct Echo;

impl LanguageModel for Echo {
    type Error = std::convert::Infallible;

    async fn respond(&self, request: LLMRequest) -> std::result::Result<String, Self::Error> {
        let prompt = request.messages().last().map_or("", |m| m.content());
        Ok(format!("(prompt of {} characters)", prompt.len()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let corpus = CorpusBuilder::new([
        "Bonds pay regular interest and return the principal at maturity.",
        "Diversification spreads investments across asset classes.",
        "Inflation erodes purchasing power over time.",
    ])
    .source(Rates)
    .build()
    .await;

    let retriever = Retriever::build(DemoEmbedder, corpus).await?;
    let question = "How do bonds pay me?";

    println!("Top matches:");
    for (rank, hit) in retriever.retrieve_scored(question, 2).await?.iter().enumerate() {
        println!("{rank}: (distance = {:.1}) - {}", hit.distance, hit.passage.text);
    }

    let passages = retriever.retrieve(question, 2).await?;
    let answer = AnswerGenerator::new(Echo).generate(question, &passages).await?;
    println!("Answer: {answer}");

    Ok(())
}
