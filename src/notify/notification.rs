use crate::error::NotifyError;
use crate::pipeline::classifier::Category;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A request to announce one fired category.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub category: Category,
    pub message: String,
    pub requested_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(category: Category, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            message: message.into(),
            requested_at: Utc::now(),
        }
    }
}

/// What happened to a notification, reported back to the scan loop.
#[derive(Debug)]
pub struct NotifyOutcome {
    pub notification: Notification,
    pub result: Result<(), NotifyError>,
}

impl NotifyOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
