//! Line-based terminal client for a running service.

use std::time::Duration;

use finrag_core::llm::{Message, Role};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::config::ChatArgs;
use crate::routes::{ChatRequest, ChatResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The service could not produce an answer.
#[derive(Debug, Error)]
#[error("Error: Unable to get an answer.")]
pub struct Unavailable;

/// Keeps the conversation locally; the service itself is stateless.
#[derive(Debug)]
pub struct ChatClient {
    http: reqwest::Client,
    url: String,
    history: Vec<Message>,
}

impl ChatClient {
    /// Creates a client for the chat endpoint at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            history: Vec::new(),
        }
    }

    /// Sends one question. The question is kept in history even if no answer arrives.
    ///
    /// # Errors
    /// Returns [`Unavailable`] on transport failures, non-success statuses and unreadable bodies.
    pub async fn ask(&mut self, question: &str) -> Result<String, Unavailable> {
        self.history.push(Message::user(question));

        let response = self
            .http
            .post(&self.url)
            .timeout(REQUEST_TIMEOUT)
            .json(&ChatRequest {
                query: question.to_owned(),
            })
            .send()
            .await
            .map_err(|error| {
                tracing::debug!(error = %error, "Chat request failed");
                Unavailable
            })?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "Chat request rejected");
            return Err(Unavailable);
        }

        let answer = response
            .json::<ChatResponse>()
            .await
            .map_err(|_| Unavailable)?
            .response;
        self.history.push(Message::assistant(answer.clone()));
        Ok(answer)
    }

    /// Messages exchanged so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Forgets the conversation.
    pub fn clear(&mut self) {
        self.history.clear();
    }
}

/// Runs `finrag chat` until `/quit` or end of input.
///
/// # Errors
/// Fails only on terminal I/O errors.
pub async fn run(args: ChatArgs) -> anyhow::Result<()> {
    let mut client = ChatClient::new(args.url);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("Finance RAG Chatbot");
    println!("Ask your finance-related question, and get an answer.");
    println!("Commands: /history, /clear, /quit\n");

    loop {
        stdout.write_all(b"You> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" | "/q" => break,
            "/history" => print_history(client.history()),
            "/clear" => {
                client.clear();
                println!("History cleared.");
            }
            question => match client.ask(question).await {
                Ok(answer) => println!("\nAssistant> {answer}\n"),
                Err(error) => println!("\x1b[31m{error}\x1b[0m\n"),
            },
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn print_history(history: &[Message]) {
    if history.is_empty() {
        println!("No conversation history.");
        return;
    }
    println!("Conversation history ({} messages):", history.len());
    for message in history {
        let role = match message.role() {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
        };
        println!("  [{role}] {}", message.content());
    }
}
