//! Asset pipeline for gilder.
//!
//! Compiles hand-authored sources into minified assets inside the source tree,
//! then copies them into the output tree and expands includes. Every task reads
//! one shared [`PipelineConfig`] and reports its outcome on a [`Notifier`].

pub mod clean;
pub mod config;
pub mod copy;
pub mod error;
pub mod events;
pub mod includes;
pub mod libs;
pub mod matcher;
pub mod pipeline;
pub mod scripts;
pub mod sprite;
pub mod styles;
pub mod task;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use events::{AssetEvent, Notifier};
pub use matcher::PathMatcher;
pub use pipeline::{FailurePolicy, Pipeline, SeriesReport};
pub use task::{Task, TaskOutput, BUILD, DEV};
