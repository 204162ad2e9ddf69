pub mod feed_client;

pub use feed_client::{DummyJsonClient, FeedClient};
