pub mod completion;
pub mod config;
pub mod contents;
pub mod list;
pub mod metadata;
pub mod pack;
