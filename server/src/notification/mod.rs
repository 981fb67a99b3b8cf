//! Push notifications for favourite streamer activity.

pub mod manual;
pub mod sink;
pub mod types;

pub use sink::{NotificationSink, NotifyError, TracingNotificationSink};
pub use types::PushMessage;
