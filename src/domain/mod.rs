pub mod item;
pub mod report;

pub use item::{ContentItem, Platform};
pub use report::{PushFailure, SyncReport};
