pub mod article;
pub mod source;
pub mod state;

pub use article::Article;
pub use source::{Source, SourceKind};
pub use state::FeedState;
