//! Scripted transport for exercising the pipeline without a server.

use crate::api::client::ApiTransport;
use crate::error::ReceiptError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Clone)]
enum Scripted {
    Body(String),
    Status(u16),
}

/// Answers GETs from a fixed table; unknown paths get a 404.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: HashMap<String, Scripted>,
    gates: HashMap<String, Arc<Notify>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self, path: &str, value: serde_json::Value) -> Self {
        self.responses
            .insert(path.to_string(), Scripted::Body(value.to_string()));
        self
    }

    pub fn body(mut self, path: &str, body: &str) -> Self {
        self.responses
            .insert(path.to_string(), Scripted::Body(body.to_string()));
        self
    }

    pub fn status(mut self, path: &str, status: u16) -> Self {
        self.responses
            .insert(path.to_string(), Scripted::Status(status));
        self
    }

    /// Hold requests for `path` until `gate` is notified.
    pub fn gate(mut self, path: &str, gate: Arc<Notify>) -> Self {
        self.gates.insert(path.to_string(), gate);
        self
    }

    /// Paths requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    async fn get(&self, path: &str) -> Result<String, ReceiptError> {
        self.requests.lock().unwrap().push(path.to_string());

        if let Some(gate) = self.gates.get(path) {
            gate.notified().await;
        }

        match self.responses.get(path).cloned() {
            Some(Scripted::Body(body)) => Ok(body),
            Some(Scripted::Status(status)) => Err(ReceiptError::Status {
                path: path.to_string(),
                status,
            }),
            None => Err(ReceiptError::Status {
                path: path.to_string(),
                status: 404,
            }),
        }
    }
}
