//! # Notification Delivery
//!
//! The platform primitive that actually shows reminders to the user, and the
//! permission prompt guarding it. The scheduler only talks to these traits.
//!
//! [`LogDelivery`] is the adapter the server binary runs with: it assigns ids
//! and writes every delivery to the log instead of a device notification tray.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// What a reminder says
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub notification_type: String,
}

/// When the delivery primitive should wake up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// Every day at the given local hour
    Daily { hour: u32 },
    /// Every week on `weekday` (0 = Sunday) at the given local hour
    Weekly { weekday: u8, hour: u32 },
}

#[async_trait]
pub trait NotificationDelivery: Send + Sync {
    /// Register a repeating delivery and return its id
    async fn schedule(&self, trigger: Trigger, content: &NotificationContent) -> Result<String>;

    async fn cancel(&self, delivery_id: &str) -> Result<()>;

    async fn cancel_all(&self) -> Result<()>;

    /// Show a notification right away
    async fn fire_now(&self, content: &NotificationContent) -> Result<String>;
}

#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn request_notification_permission(&self) -> bool;
}

/// Delivery adapter that logs instead of displaying
#[derive(Clone, Default)]
pub struct LogDelivery {
    active: Arc<Mutex<HashMap<String, (Trigger, NotificationContent)>>>,
}

impl LogDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().map(|active| active.len()).unwrap_or(0)
    }
}

#[async_trait]
impl NotificationDelivery for LogDelivery {
    async fn schedule(&self, trigger: Trigger, content: &NotificationContent) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        info!(
            "Scheduled '{}' ({}) with trigger {:?} as {}",
            content.title, content.notification_type, trigger, id
        );
        if let Ok(mut active) = self.active.lock() {
            active.insert(id.clone(), (trigger, content.clone()));
        }
        Ok(id)
    }

    async fn cancel(&self, delivery_id: &str) -> Result<()> {
        if let Ok(mut active) = self.active.lock() {
            if active.remove(delivery_id).is_some() {
                debug!("Cancelled delivery {}", delivery_id);
            }
        }
        Ok(())
    }

    async fn cancel_all(&self) -> Result<()> {
        if let Ok(mut active) = self.active.lock() {
            info!("Cancelled {} deliveries", active.len());
            active.clear();
        }
        Ok(())
    }

    async fn fire_now(&self, content: &NotificationContent) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        info!("🔔 {}: {}", content.title, content.body);
        Ok(id)
    }
}

/// Permission gate for environments without an interactive prompt
#[derive(Clone, Copy)]
pub struct StaticPermission(pub bool);

#[async_trait]
impl PermissionGate for StaticPermission {
    async fn request_notification_permission(&self) -> bool {
        self.0
    }
}
