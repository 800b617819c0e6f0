/// Storage seam for access records and the visit counter.
///
/// The counter and the access-record log are the only shared mutable
/// state the core touches, and each request updates them through exactly
/// one trait call, so the record/counter pairing can be made one
/// transactional unit by the implementation. `MemoryAccessStore` is the
/// reference implementation used by tests and embedders without a real
/// database.
use crate::error::{Error, Result};
use crate::types::{DeviceClass, EvaluationContext, LinkId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One logged access, written only for requests that were let through.
///
/// Blocked requests increment the counter without a record (no visitor
/// data is retained for rejected attempts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub at_ms: i64,
    pub country: Option<String>,
    pub device: Option<DeviceClass>,
    pub ip: Option<String>,
    pub is_bot: bool,
    pub is_vpn: bool,
}

impl AccessRecord {
    pub fn from_context(ctx: &EvaluationContext) -> Self {
        Self {
            at_ms: ctx.now_ms,
            country: ctx.country.clone(),
            device: ctx.device,
            ip: ctx.ip.clone(),
            is_bot: ctx.is_bot,
            is_vpn: ctx.is_vpn,
        }
    }
}

/// Per-link side-effect sink.
///
/// Both methods are a single atomic unit of work: a caller never sees a
/// counter increment without its record (or vice versa) torn apart.
/// Both return the post-increment counter value.
pub trait AccessStore: Send + Sync {
    /// Append an access record and increment the visit counter, as one
    /// unit.
    fn record_visit(&self, link_id: LinkId, record: AccessRecord) -> Result<u64>;

    /// Increment the visit counter only (explicit block: counted, not
    /// logged).
    fn record_blocked(&self, link_id: LinkId) -> Result<u64>;
}

#[derive(Debug, Default)]
struct LinkAccessState {
    visit_count: u64,
    records: Vec<AccessRecord>,
}

/// In-memory `AccessStore` behind a single mutex.
#[derive(Debug, Default)]
pub struct MemoryAccessStore {
    links: Mutex<HashMap<LinkId, LinkAccessState>>,
}

impl MemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a link's counter, e.g. when mirroring an existing link.
    pub fn set_visit_count(&self, link_id: LinkId, count: u64) {
        self.links.lock().entry(link_id).or_default().visit_count = count;
    }

    /// Current counter value (0 for unknown links).
    pub fn visit_count(&self, link_id: LinkId) -> u64 {
        self.links
            .lock()
            .get(&link_id)
            .map(|s| s.visit_count)
            .unwrap_or(0)
    }

    /// Snapshot of the records logged for a link.
    pub fn records(&self, link_id: LinkId) -> Vec<AccessRecord> {
        self.links
            .lock()
            .get(&link_id)
            .map(|s| s.records.clone())
            .unwrap_or_default()
    }
}

impl AccessStore for MemoryAccessStore {
    fn record_visit(&self, link_id: LinkId, record: AccessRecord) -> Result<u64> {
        let mut links = self.links.lock();
        let state = links.entry(link_id).or_default();
        state.visit_count = state
            .visit_count
            .checked_add(1)
            .ok_or_else(|| Error::Store(format!("visit counter overflow for link {}", link_id)))?;
        state.records.push(record);
        Ok(state.visit_count)
    }

    fn record_blocked(&self, link_id: LinkId) -> Result<u64> {
        let mut links = self.links.lock();
        let state = links.entry(link_id).or_default();
        state.visit_count = state
            .visit_count
            .checked_add(1)
            .ok_or_else(|| Error::Store(format!("visit counter overflow for link {}", link_id)))?;
        Ok(state.visit_count)
    }
}
