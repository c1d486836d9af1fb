//! X bookmark collection.
//!
//! Scrolls the bookmarks timeline, opens each post and harvests the links in its replies.

mod collector;
mod parser;
mod types;

pub use collector::{BookmarkCollector, CollectOptions, BOOKMARKS_URL};
pub use parser::{BookmarkParser, ThreadParser};
pub use types::{PostRef, ReplyLink};
