pub mod context;
pub mod error;
pub mod reader;

pub use context::AppContext;
pub use error::{FeedRelayError, Result};
pub use reader::{LoadStatus, Reader};
