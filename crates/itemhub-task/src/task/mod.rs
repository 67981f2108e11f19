//! Task model.

pub mod kind;
pub mod model;
pub mod output;
pub mod status;

pub use kind::TaskKind;
pub use model::{InputResolver, Task};
pub use output::TaskOutput;
pub use status::TaskStatus;
