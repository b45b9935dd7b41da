//! Receivers of server-pushed notifications.

use log::debug;
use tokio::sync::mpsc;

use super::protocol::Notification;

/// Out-of-band receiver of notifications.
///
/// Called from the reader task only, so implementations must not block.
pub trait NotificationObserver: Send + Sync {
    fn on_notification(&self, notification: &Notification);
}

/// Default observer: logs every notification at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifications;

impl NotificationObserver for LogNotifications {
    fn on_notification(&self, notification: &Notification) {
        debug!(
            target: "godot_bridge::bridge::notification",
            "Notification {}: {}",
            notification.event,
            notification.data
        );
    }
}

/// Forward notifications into a channel.
impl NotificationObserver for mpsc::UnboundedSender<Notification> {
    fn on_notification(&self, notification: &Notification) {
        if self.send(notification.clone()).is_err() {
            debug!(
                target: "godot_bridge::bridge::notification",
                "Notification receiver dropped, discarding {}",
                notification.event
            );
        }
    }
}
