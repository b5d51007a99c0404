use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// View bookkeeping for one browsing session. Not persisted: a restart
/// starts a new session with fresh counters.
#[derive(Debug, Clone)]
pub struct ViewSession {
    session_id: Uuid,
    cap_per_item: u32,
    submitted: HashMap<String, u32>,
    pending: HashSet<String>,
}

/// Why a submission slot was not granted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    CapReached,
    InFlight,
}

impl ViewSession {
    pub fn new(cap_per_item: u32) -> Self {
        Self::with_id(Uuid::new_v4(), cap_per_item)
    }

    pub fn with_id(session_id: Uuid, cap_per_item: u32) -> Self {
        Self {
            session_id,
            cap_per_item,
            submitted: HashMap::new(),
            pending: HashSet::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn submitted_count(&self, item_id: &str) -> u32 {
        self.submitted.get(item_id).copied().unwrap_or(0)
    }

    pub fn is_pending(&self, item_id: &str) -> bool {
        self.pending.contains(item_id)
    }

    /// Reserve the right to submit one view for `item_id`
    pub fn try_reserve(&mut self, item_id: &str) -> Result<(), Refusal> {
        if self.submitted_count(item_id) >= self.cap_per_item {
            return Err(Refusal::CapReached);
        }
        if !self.pending.insert(item_id.to_string()) {
            return Err(Refusal::InFlight);
        }
        Ok(())
    }

    /// Settle a reservation. Only a successful submission counts.
    pub fn complete(&mut self, item_id: &str, succeeded: bool) {
        self.pending.remove(item_id);
        if succeeded {
            let count = self.submitted.entry(item_id.to_string()).or_insert(0);
            *count = (*count + 1).min(self.cap_per_item);
        }
    }
}
