mod conversions;
mod types;

pub use types::{BatchSyncRequest, BatchSyncResponse};
