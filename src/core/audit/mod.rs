//! Decision auditing
//!
//! The enforcer hands every decision (allow, explicit deny, implicit deny)
//! to an optional [`Auditor`]. Infrastructure failures are not audited.
//!
//! Bundled auditors:
//! - [`TracingAuditor`] - emits each record as a `tracing` event
//! - [`MemoryAuditor`] - bounded in-memory ring of the latest records

use crate::core::iam::{Effect, Request};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::info;

/// Outcome of one enforce call
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub request: Request,
    /// Ids of matched policies, in evaluation order. An explicit deny ends
    /// the list.
    pub matched: Vec<String>,
    /// Final effect of the decision
    pub effect: Effect,
    /// True when a Deny policy matched (as opposed to the default effect)
    pub explicit: bool,
}

impl AuditRecord {
    pub fn new(request: &Request, matched: Vec<String>, effect: Effect, explicit: bool) -> Self {
        AuditRecord {
            timestamp: Utc::now(),
            request: request.clone(),
            matched,
            effect,
            explicit,
        }
    }
}

/// Sink for decision outcomes
pub trait Auditor: Send + Sync {
    fn record(&self, record: &AuditRecord);
}

/// Auditor writing records to the `tracing` pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditor;

impl Auditor for TracingAuditor {
    fn record(&self, record: &AuditRecord) {
        info!(
            role = %record.request.role,
            action = %record.request.action,
            resource = %record.request.resource,
            scope = %record.request.scope,
            effect = %record.effect,
            explicit = record.explicit,
            matched = ?record.matched,
            "authorization decision"
        );
    }
}

/// Keeps the most recent records in memory
///
/// Once full, the oldest record is dropped for each new one.
#[derive(Debug)]
pub struct MemoryAuditor {
    capacity: usize,
    ring: Mutex<Ring>,
}

#[derive(Debug, Default)]
struct Ring {
    records: VecDeque<AuditRecord>,
    total: u64,
}

impl MemoryAuditor {
    /// Create an auditor holding up to `capacity` records (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        MemoryAuditor {
            capacity,
            ring: Mutex::new(Ring {
                records: VecDeque::with_capacity(capacity),
                total: 0,
            }),
        }
    }

    /// Snapshot of the retained records, oldest first
    pub fn records(&self) -> Vec<AuditRecord> {
        self.ring.lock().records.iter().cloned().collect()
    }

    /// Most recent record
    pub fn last(&self) -> Option<AuditRecord> {
        self.ring.lock().records.back().cloned()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().records.is_empty()
    }

    /// Records seen since creation, including evicted ones
    pub fn total_recorded(&self) -> u64 {
        self.ring.lock().total
    }

    pub fn clear(&self) {
        self.ring.lock().records.clear();
    }
}

impl Auditor for MemoryAuditor {
    fn record(&self, record: &AuditRecord) {
        let mut ring = self.ring.lock();
        if ring.records.len() == self.capacity {
            ring.records.pop_front();
        }
        ring.records.push_back(record.clone());
        ring.total += 1;
    }
}
