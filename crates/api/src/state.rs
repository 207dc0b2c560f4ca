use std::sync::Arc;

use cruisemall_backup::BackupSink;
use cruisemall_events::{EventBus, OutboundDispatcher};

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind an `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub pool: cruisemall_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Platform events; persisted to the `events` table by a subscriber.
    pub event_bus: Arc<EventBus>,
    /// Outbound SMS / email / Kakao delivery, shared with the dispatch job.
    pub dispatcher: Arc<OutboundDispatcher>,
    /// Destination for manual and scheduled backups.
    pub backup_sink: Arc<dyn BackupSink>,
}
