pub mod credential;
pub mod document;
pub mod progress;
pub mod track;

pub use credential::*;
pub use document::*;
pub use progress::*;
pub use track::*;
