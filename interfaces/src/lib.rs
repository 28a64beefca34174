pub mod defs;

pub use defs::{DeliveryStatus, FeedSource, LinkShortener, Pusher, RawItem, Summarizer, UNKNOWN_SOURCE};
