//! Verification domain events
//!
//! Events are the audit trail of the integrity core: every terminal
//! verification decision emits exactly one. Publishing is
//! fire-and-observe — a failed publish is logged and never turns a
//! verification result into an error.

use crate::hash::ContentHash;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};
use thiserror::Error;
use tracing::{info, warn};

/// Emitted when an artifact's structure and all signatures verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerkleGraphVerifiedEvent {
    pub artifact_id: String,
    pub root_hash: ContentHash,
    /// Key ids of every signature that verified.
    pub verified_signatures: Vec<String>,
}

/// Emitted when structure or a signature failed verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerkleVerificationFailedEvent {
    pub artifact_id: String,
    pub root_hash: ContentHash,
    pub reason: String,
}

/// Emitted when stored bytes no longer match a node's declared hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TamperingDetectedEvent {
    pub artifact_id: String,
    pub node_path: String,
    pub expected_hash: ContentHash,
    pub actual_hash: ContentHash,
}

/// Any event the verification service can emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VerificationEvent {
    GraphVerified(MerkleGraphVerifiedEvent),
    VerificationFailed(MerkleVerificationFailedEvent),
    TamperingDetected(TamperingDetectedEvent),
}

/// A published event with its emission timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub ts: String,
    #[serde(flatten)]
    pub event: VerificationEvent,
}

impl EventEnvelope {
    pub fn with_now(event: VerificationEvent) -> Self {
        Self {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            event,
        }
    }
}

#[derive(Debug, Error)]
#[error("event channel closed")]
pub struct PublishError;

/// Port for event emission.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: VerificationEvent) -> Result<(), PublishError>;
}

/// Publisher that routes events into the process log.
#[derive(Debug, Default)]
pub struct TracingEventPublisher;

impl EventPublisher for TracingEventPublisher {
    fn publish(&self, event: VerificationEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_string(&event).unwrap_or_else(|_| format!("{event:?}"));
        match &event {
            VerificationEvent::GraphVerified(_) => info!(event = %payload, "Artifact verified"),
            VerificationEvent::VerificationFailed(_) => {
                warn!(event = %payload, "Artifact verification failed")
            }
            VerificationEvent::TamperingDetected(_) => {
                warn!(event = %payload, "Tampering detected")
            }
        }
        Ok(())
    }
}

/// In-process event bus for audit/observability consumers.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new_pair() -> (Self, Receiver<EventEnvelope>) {
        let (sender, receiver) = channel();
        (Self { sender }, receiver)
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: VerificationEvent) -> Result<(), PublishError> {
        self.sender
            .send(EventEnvelope::with_now(event))
            .map_err(|_| PublishError)
    }
}
