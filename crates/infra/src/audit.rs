//! Audit sinks: a bounded in-memory log that backs the admin listing endpoint,
//! a tracing sink that writes each event as a structured log line, and a
//! fan-out that feeds several sinks at once.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::info;

use keyward_auth::{AuditEvent, AuditSink};

/// Default number of retained events.
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

/// Upper bound on one page of [`InMemoryAuditLog::list`].
pub const MAX_PAGE_SIZE: usize = 1_000;

/// Bounded, newest-first audit log. Oldest events are dropped once full.
#[derive(Debug)]
pub struct InMemoryAuditLog {
    capacity: usize,
    events: Mutex<VecDeque<AuditEvent>>,
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }
}

impl InMemoryAuditLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::new()),
        }
    }

    /// Page through events, most recent first.
    pub fn list(&self, skip: usize, limit: usize) -> Vec<AuditEvent> {
        let Ok(events) = self.events.lock() else {
            return Vec::new();
        };
        events
            .iter()
            .skip(skip)
            .take(limit.min(MAX_PAGE_SIZE))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for InMemoryAuditLog {
    fn emit(&self, event: AuditEvent) {
        let Ok(mut events) = self.events.lock() else {
            return;
        };
        events.push_front(event);
        events.truncate(self.capacity);
    }
}

/// Writes every event as an `audit` target log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        info!(
            target: "audit",
            action = %event.action,
            actor = ?event.actor.map(|a| a.to_string()),
            target_id = ?event.target,
            ip_address = ?event.ip_address,
            details = %event.details,
            "audit event"
        );
    }
}

/// Forwards each event to every inner sink.
#[derive(Clone, Default)]
pub struct FanoutAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl FanoutAuditSink {
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }
}

impl AuditSink for FanoutAuditSink {
    fn emit(&self, event: AuditEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}
