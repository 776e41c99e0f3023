//! End-to-end behaviour of the chat API with stub models.

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use finrag_core::{
    EmbeddingModel, LanguageModel,
    llm::{LLMRequest, Role},
};
use finrag_rag::{
    AnswerGenerator, Corpus, CorpusBuilder, NO_MATCH_MESSAGE, Retriever, SYSTEM_PROMPT,
};
use finrag_server::{ChatService, router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const VOCAB: [&str; 6] = ["bond", "stock", "crypto", "edmonton", "tax", "inflation"];

/// Counts vocabulary words.
struct Keywords;

impl EmbeddingModel for Keywords {
    fn dim(&self) -> usize {
        VOCAB.len()
    }

    #[allow(clippy::cast_precision_loss)]
    async fn embed(&self, text: &str) -> finrag_core::Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(VOCAB
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect())
    }
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<LLMRequest>>>);

impl Recorder {
    fn requests(&self) -> Vec<LLMRequest> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Debug, thiserror::Error)]
enum StubError {
    #[error("HTTP 503: upstream unavailable")]
    Down,
}

enum Behaviour {
    Answer(&'static str),
    Echo,
    Fail,
    Panic,
}

struct StubModel {
    behaviour: Behaviour,
    recorder: Recorder,
}

impl LanguageModel for StubModel {
    type Error = StubError;

    async fn respond(&self, request: LLMRequest) -> Result<String, Self::Error> {
        let prompt = request
            .messages()
            .last()
            .map(|m| m.content().to_owned())
            .unwrap_or_default();
        self.recorder.0.lock().unwrap().push(request);
        match self.behaviour {
            Behaviour::Answer(text) => Ok(text.to_owned()),
            Behaviour::Echo => Ok(prompt),
            Behaviour::Fail => Err(StubError::Down),
            Behaviour::Panic => panic!("model exploded"),
        }
    }
}

fn facts() -> Corpus {
    Corpus::curated([
        "Bonds are fixed-income investments that pay regular interest.",
        "Stocks represent ownership in a company.",
        "Cryptocurrencies are highly volatile; crypto is not insured.",
        "Edmonton's real estate market has shown growth.",
        "Inflation erodes purchasing power over time.",
    ])
}

async fn app(corpus: Corpus, behaviour: Behaviour) -> (Router, Recorder) {
    let recorder = Recorder::default();
    let retriever = Retriever::build(Keywords, corpus).await.unwrap();
    let generator = AnswerGenerator::new(StubModel {
        behaviour,
        recorder: recorder.clone(),
    });
    let service = Arc::new(ChatService::new(retriever, generator, 2));
    (router(service), recorder)
}

async fn post_chat(app: Router, path: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::post(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_owned()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn grounded_answer_uses_top_two_passages() {
    let (app, recorder) = app(facts(), Behaviour::Answer("  Crypto is risky.  ")).await;

    let (status, body) = post_chat(
        app,
        "/chat/",
        &json!({"query": "What are the risks of crypto?"}).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": "Crypto is risky."}));

    let requests = recorder.requests();
    assert_eq!(requests.len(), 1);
    let messages = requests[0].messages();
    assert_eq!(messages[0].role(), Role::System);
    assert_eq!(messages[1].role(), Role::User);

    let prompt = messages[1].content();
    let retrieved = prompt
        .split("Retrieved Information:\n")
        .nth(1)
        .and_then(|rest| rest.split("\n\nUser Question:").next())
        .unwrap();
    let lines: Vec<&str> = retrieved.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "Cryptocurrencies are highly volatile; crypto is not insured."
    );
    assert!(prompt.ends_with("User Question: What are the risks of crypto?\nAnswer:"));
}

#[tokio::test]
async fn bond_question_ranks_bond_passage_first() {
    let corpus = Corpus::curated([
        "Bonds are fixed-income investments that pay periodic interest and return principal at maturity.",
        "ETFs trade like stocks on exchanges and hold baskets of assets.",
    ]);
    let retriever = Retriever::build(Keywords, corpus).await.unwrap();

    let passages = retriever.retrieve("What is a bond?", 2).await.unwrap();

    assert_eq!(passages.len(), 2);
    assert!(passages[0].starts_with("Bonds are fixed-income investments"));
    assert!(passages[1].starts_with("ETFs trade like stocks"));
}

#[tokio::test]
async fn off_topic_question_carries_decline_instruction() {
    let (app, recorder) = app(facts(), Behaviour::Echo).await;

    let (status, body) = post_chat(
        app,
        "/chat/",
        &json!({"query": "What's the best pizza topping?"}).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let echoed = body["response"].as_str().unwrap();
    assert!(echoed.contains("If a question falls outside this scope, politely decline to answer."));
    assert!(echoed.ends_with("User Question: What's the best pizza topping?\nAnswer:"));

    let requests = recorder.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages()[0].content(), SYSTEM_PROMPT);
}

#[tokio::test]
async fn route_without_trailing_slash_also_answers() {
    let (app, _) = app(facts(), Behaviour::Answer("ok")).await;
    let (status, body) = post_chat(app, "/chat", r#"{"query": "bond"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "ok");
}

#[tokio::test]
async fn empty_knowledge_returns_no_match_without_calling_model() {
    let corpus = CorpusBuilder::new(Vec::<String>::new()).build().await;
    let (app, recorder) = app(corpus, Behaviour::Answer("should not be used")).await;

    let (status, body) = post_chat(app, "/chat/", r#"{"query": "What is a bond?"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], NO_MATCH_MESSAGE);
    assert!(recorder.requests().is_empty());
}

#[tokio::test]
async fn upstream_failure_is_a_500_with_detail() {
    let (app, recorder) = app(facts(), Behaviour::Fail).await;

    let (status, body) = post_chat(app, "/chat/", r#"{"query": "Is inflation bad?"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"detail": "Completion API error: HTTP 503: upstream unavailable"})
    );
    assert_eq!(recorder.requests().len(), 1);
}

#[tokio::test]
async fn panics_become_unexpected_errors() {
    let (app, _) = app(facts(), Behaviour::Panic).await;

    let (status, body) = post_chat(app, "/chat/", r#"{"query": "tax?"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"detail": "An unexpected error occurred: model exploded"})
    );
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let (app, recorder) = app(facts(), Behaviour::Answer("unused")).await;

    let (status, _) = post_chat(app, "/chat/", r#"{"question": "wrong field"}"#).await;

    assert!(status.is_client_error());
    assert!(recorder.requests().is_empty());
}

#[tokio::test]
async fn health_reports_passage_count() {
    let (app, _) = app(facts(), Behaviour::Answer("unused")).await;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"status": "ok", "passages": 5}));
}

#[tokio::test]
async fn concurrent_requests_are_independent() {
    let (app, recorder) = app(facts(), Behaviour::Answer("fine")).await;

    let queries = ["bond yields", "stock picks", "crypto risk", "edmonton homes"];
    let handles: Vec<_> = queries
        .iter()
        .map(|q| {
            let app = app.clone();
            let body = json!({ "query": q }).to_string();
            tokio::spawn(async move { post_chat(app, "/chat/", &body).await })
        })
        .collect();

    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "fine");
    }
    assert_eq!(recorder.requests().len(), queries.len());
}
