//! Fixtures and an in-memory transport for workflow tests.

use async_trait::async_trait;
use serde_json::Value;
use slide_client::{ApiClient, Transport, TransportError};
use slide_protocol::{Deck, DeckSlide, Outline, OutlineSlide};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub(crate) fn sample_outline(n: usize) -> Outline {
    Outline {
        title: "Climate Change".to_string(),
        slides: (1..=n)
            .map(|i| OutlineSlide {
                title: format!("Slide {i}"),
                summary: format!("Summary {i}"),
                citations: (i == 1).then(|| vec!["IPCC AR6".to_string()]),
            })
            .collect(),
    }
}

pub(crate) fn sample_deck(n: usize) -> Deck {
    Deck {
        outline: sample_outline(n),
        slides: (1..=n)
            .map(|i| DeckSlide {
                bullets: vec![format!("Point {i}.a"), format!("Point {i}.b")],
                notes: format!("Notes {i}"),
                image_prompt: format!("Illustration {i}"),
            })
            .collect(),
    }
}

pub(crate) fn json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap()
}

/// Replays queued replies per endpoint and logs every call. With a gate,
/// each reply waits for one permit, so tests control when results land.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Result<Value, TransportError>>>>,
    calls: Mutex<Vec<(String, Value)>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub(crate) fn reply(self, endpoint: &str, reply: Result<Value, TransportError>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(e, _)| e.clone()).collect()
    }

    pub(crate) fn payloads(&self) -> Vec<Value> {
        self.calls.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }

    pub(crate) fn into_api(self) -> (Arc<Self>, ApiClient) {
        let transport = Arc::new(self);
        let api = ApiClient::new(transport.clone(), "http://localhost:8000");
        (transport, api)
    }

    async fn next_reply(&self, endpoint: &str) -> Result<Value, TransportError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.replies
            .lock()
            .unwrap()
            .get_mut(endpoint)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Err(TransportError::new(format!("no scripted reply for {endpoint}"))))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(&self, endpoint: &str, payload: Value) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push((endpoint.to_string(), payload));
        self.next_reply(endpoint).await
    }

    async fn get_json(&self, endpoint: &str) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push((endpoint.to_string(), Value::Null));
        self.next_reply(endpoint).await
    }
}
