#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use tasklist_core::{
    Clock, Filter, MemorySlotRepository, PersistenceGateway, Renderer, Severity, SlotError,
    SlotRepository, SlotResult, Task,
};

/// 2026-10-18T09:30:00.000Z
pub const FIXED_MILLIS: u64 = 1_792_315_800_000;

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn new() -> Self {
        Self(Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Backend that refuses every write.
pub struct BrokenSlots;

impl SlotRepository for BrokenSlots {
    fn get(&self, _key: &str) -> SlotResult<Option<String>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> SlotResult<()> {
        Err(SlotError::Unavailable("disk detached".to_string()))
    }

    fn remove(&self, _key: &str) -> SlotResult<()> {
        Ok(())
    }

    fn clear(&self) -> SlotResult<()> {
        Ok(())
    }
}

pub fn memory_gateway(repo: &MemorySlotRepository) -> PersistenceGateway<&MemorySlotRepository> {
    PersistenceGateway::new(repo).with_clock(FixedClock::new())
}

#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub lists: Vec<Vec<Task>>,
    pub counts: Vec<(usize, usize)>,
    pub filters: Vec<Filter>,
    pub messages: Vec<(String, Severity)>,
}

impl RecordingRenderer {
    pub fn last_list(&self) -> &[Task] {
        self.lists.last().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn last_message(&self) -> Option<&(String, Severity)> {
        self.messages.last()
    }
}

impl Renderer for RecordingRenderer {
    fn render_list(&mut self, items: &[Task]) {
        self.lists.push(items.to_vec());
    }

    fn render_counts(&mut self, total: usize, completed: usize) {
        self.counts.push((total, completed));
    }

    fn render_filter_state(&mut self, active: Filter) {
        self.filters.push(active);
    }

    fn show_message(&mut self, text: &str, severity: Severity) {
        self.messages.push((text.to_string(), severity));
    }
}
