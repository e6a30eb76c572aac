pub mod exporter;
pub mod notifier;

pub use exporter::Exporter;
pub use notifier::{ConsoleNotifier, Notice, NoticeLevel, Notifier};
