//! Progress events emitted by the pipeline.
//!
//! The pipeline core holds no presentation state: each state change is
//! emitted as an event and whatever presentation layer is attached decides
//! how to render it.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    BatchStarted {
        index: usize,
        jobs: usize,
    },
    JobSkipped {
        video: PathBuf,
    },
    JobRequeued {
        video: PathBuf,
    },
    TaskStarted {
        video: PathBuf,
        quality: &'static str,
    },
    TaskFinished {
        video: PathBuf,
        quality: &'static str,
        success: bool,
        reason: Option<String>,
    },
    JobFinished {
        video: PathBuf,
        succeeded: usize,
        failed: usize,
    },
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Send an event if anyone is listening; a closed receiver is not an error.
pub(crate) fn emit(tx: Option<&ProgressSender>, event: ProgressEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
}
