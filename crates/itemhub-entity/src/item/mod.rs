//! Item domain entities.

pub mod input;
pub mod model;

pub use input::{CreateItemInput, UpdateItemInput};
pub use model::{FOLDER_TYPE, Item};
