// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User notifications.

use crate::db::MemoryDb;
use crate::error::Result;
use crate::models::NotificationKind;
use async_trait::async_trait;

/// Delivers a message to a user.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user_id: u64, title: &str, content: &str) -> Result<()>;
}

/// Notifications are kept in the store for the user's notification feed.
#[async_trait]
impl NotificationSink for MemoryDb {
    async fn notify(&self, user_id: u64, title: &str, content: &str) -> Result<()> {
        self.insert_notification(user_id, NotificationKind::Info, title, content)
            .await;
        Ok(())
    }
}

/// Body of the "visits detected" notification.
pub fn visits_found_message(count: usize) -> String {
    match count {
        1 => "Found 1 new visit. Review it to confirm or decline.".to_string(),
        n => format!("Found {} new visits. Review them to confirm or decline.", n),
    }
}
