//! Request handlers.

pub mod download;
pub mod health;
pub mod jobs;
pub mod stream;

pub use download::*;
pub use health::*;
pub use jobs::*;
pub use stream::*;
