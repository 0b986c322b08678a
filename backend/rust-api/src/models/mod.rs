pub mod analysis;
pub mod attempt;
pub mod content;
pub mod document;
pub mod learning_path;
pub mod prediction;
pub mod profile;
