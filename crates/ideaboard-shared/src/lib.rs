//! # ideaboard-shared
//!
//! Types shared between the store and the HTTP server: input bounds, the
//! validated command structs every write operation consumes, and the error
//! produced when a request body fails validation.

pub mod commands;
pub mod constants;
pub mod error;

pub use commands::{FeedbackCommand, IdeaCommand, TopicCommand};
pub use error::ValidationError;
