pub mod notifier;

pub use notifier::{CheckinEvent, Notifier, NotifyResult};
