pub mod category;
pub mod classify;
pub mod document;
pub mod evidence;
pub mod intent;
pub mod lexicon;
pub mod normalize;
pub mod planner;
pub mod provision;
pub mod quality;
pub mod result;
pub mod text;
pub mod window;

mod error;

pub use error::{Error, Result};
