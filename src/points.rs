use crate::error::AppError;
use crate::models::PointsEntry;
use crate::storage::{KeyValueStore, POINTS_KEY};
use chrono::Local;
use std::sync::Arc;
use tracing::{info, warn};

/// Receiver of point awards. Callers treat it as fire-and-forget: the
/// returned flag is informational only.
pub trait PointsAward: Send + Sync {
    fn award_points(&self, points: u32, reason: &str, action_type: &str, item_id: &str) -> bool;
}

/// Logs every award and keeps a local history of them.
pub struct PointsLog {
    store: Arc<dyn KeyValueStore>,
}

impl PointsLog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn history(&self) -> Vec<PointsEntry> {
        match self.store.read(POINTS_KEY) {
            Ok(Some(content)) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding unreadable points history");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read points history");
                Vec::new()
            }
        }
    }

    pub fn total_points(&self) -> u32 {
        self.history().iter().map(|e| e.points).sum()
    }
}

impl PointsAward for PointsLog {
    fn award_points(&self, points: u32, reason: &str, action_type: &str, item_id: &str) -> bool {
        info!(points, reason, action_type, item_id, "Awarding points");

        let mut history = self.history();
        history.push(PointsEntry {
            points,
            reason: reason.to_string(),
            action_type: action_type.to_string(),
            item_id: item_id.to_string(),
            awarded_at: Local::now(),
        });

        let result = serde_json::to_string(&history)
            .map_err(AppError::from)
            .and_then(|content| self.store.write(POINTS_KEY, &content));
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to persist points history");
                false
            }
        }
    }
}
