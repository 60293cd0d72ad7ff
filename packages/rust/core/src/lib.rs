//! Core orchestration for texquiz.
//!
//! This crate ties the extractor, the synthesizer and the render pipeline
//! together: a [`Session`] owns the loaded document and its questions,
//! prepares [`RenderJob`]s, and a [`RenderWorker`] runs them in the
//! background.

pub mod document;
pub mod pipeline;
pub mod session;
pub mod worker;

pub use document::SourceDocument;
pub use pipeline::{
    RenderItem, RenderJob, RenderProgress, RenderReport, SilentProgress, render_batch,
};
pub use session::{RenderTarget, Session};
pub use worker::RenderWorker;
