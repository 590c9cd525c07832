// SPDX-FileCopyrightText: 2026 Lull Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local pending queue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use lull_core::{LullError, PendingEntry, PendingQueue};

/// Pending entries per conversation, held in memory.
///
/// Each conversation's list is only touched under its own map entry, so
/// enqueue and trim on the same key never interleave.
#[derive(Debug, Default)]
pub struct InMemoryPendingQueue {
    entries: DashMap<String, Vec<PendingEntry>>,
}

impl InMemoryPendingQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingQueue for InMemoryPendingQueue {
    async fn enqueue(&self, conversation_id: &str, entry: PendingEntry) -> Result<(), LullError> {
        self.entries
            .entry(conversation_id.to_string())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn count(&self, conversation_id: &str) -> Result<usize, LullError> {
        Ok(self
            .entries
            .get(conversation_id)
            .map_or(0, |list| list.len()))
    }

    async fn trim_until(
        &self,
        conversation_id: &str,
        until: DateTime<Utc>,
    ) -> Result<usize, LullError> {
        let removed = match self.entries.get_mut(conversation_id) {
            Some(mut list) => {
                let before = list.len();
                list.retain(|entry| entry.timestamp > until);
                before - list.len()
            }
            None => 0,
        };
        self.entries
            .remove_if(conversation_id, |_, list| list.is_empty());
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(ext: &str, secs: u32) -> PendingEntry {
        PendingEntry {
            external_id: ext.into(),
            content: ext.into(),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, secs).unwrap(),
        }
    }

    #[tokio::test]
    async fn counts_are_partitioned_by_conversation() {
        let queue = InMemoryPendingQueue::new();
        queue.enqueue("c1", entry("a", 1)).await.unwrap();
        queue.enqueue("c1", entry("b", 2)).await.unwrap();
        queue.enqueue("c2", entry("c", 3)).await.unwrap();

        assert_eq!(queue.count("c1").await.unwrap(), 2);
        assert_eq!(queue.count("c2").await.unwrap(), 1);
        assert_eq!(queue.count("unknown").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn trim_until_keeps_newer_entries() {
        let queue = InMemoryPendingQueue::new();
        queue.enqueue("c1", entry("a", 1)).await.unwrap();
        queue.enqueue("c1", entry("b", 5)).await.unwrap();
        queue.enqueue("c1", entry("c", 6)).await.unwrap();

        let cutoff = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 5).unwrap();
        assert_eq!(queue.trim_until("c1", cutoff).await.unwrap(), 2);
        assert_eq!(queue.count("c1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn trimming_everything_drops_the_key() {
        let queue = InMemoryPendingQueue::new();
        queue.enqueue("c1", entry("a", 1)).await.unwrap();

        let cutoff = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 59).unwrap();
        assert_eq!(queue.trim_until("c1", cutoff).await.unwrap(), 1);
        assert!(queue.entries.is_empty());
        assert_eq!(queue.trim_until("c1", cutoff).await.unwrap(), 0);
    }
}
