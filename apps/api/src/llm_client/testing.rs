//! Scripted `TextGenerator` for controller and route tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{GenerationError, TextGenerator};

/// One scripted reply. Consumed in call order.
pub enum Reply {
    Text(String),
    Status(u16),
    Shape,
}

/// Records every prompt it receives and answers from a queue.
/// When the queue runs dry it echoes a fixed fallback text.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
    fallback: String,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
            fallback: String::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Always answers with `text`.
    pub fn always(text: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            fallback: text.to_string(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Highest number of calls that were ever outstanding at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self.replies.lock().unwrap().pop_front();

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Give any concurrently dispatched call a chance to start.
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Status(status)) => Err(GenerationError::Request {
                status,
                message: "API request failed".to_string(),
            }),
            Some(Reply::Shape) => Err(GenerationError::ResponseShape(
                "no candidates returned".to_string(),
            )),
            None => Ok(self.fallback.clone()),
        }
    }
}

/// Returns the generator both as itself (for inspection) and as the trait
/// object the controllers take.
pub fn shared(llm: ScriptedGenerator) -> (Arc<ScriptedGenerator>, Arc<dyn TextGenerator>) {
    let concrete = Arc::new(llm);
    let dynamic: Arc<dyn TextGenerator> = concrete.clone();
    (concrete, dynamic)
}

/// Answers with fixed text after a delay on the tokio clock.
pub struct DelayedGenerator {
    delay: Duration,
    text: String,
}

impl DelayedGenerator {
    pub fn arc(delay: Duration, text: &str) -> Arc<dyn TextGenerator> {
        Arc::new(Self {
            delay,
            text: text.to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for DelayedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.text.clone())
    }
}

pub struct PanickingGenerator;

#[async_trait]
impl TextGenerator for PanickingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        panic!("generator exploded");
    }
}

/// A numbered list of `count` titles about `keyword`, wrapped in model chatter.
pub fn numbered_titles(keyword: &str, count: usize) -> String {
    let mut out = String::from("Here are some title ideas:\n\n");
    for n in 1..=count {
        out.push_str(&format!("{n}. Title {n} about {keyword}\n"));
    }
    out.push_str("\nLet me know if you want more!");
    out
}
