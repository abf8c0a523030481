//! Collaborator abstraction for page templating

pub mod mock;
pub mod traits;

pub use mock::{MockBackend, MockCall};
pub use traits::PageBackend;
