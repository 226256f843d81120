//! External classifier dispatch
//!
//! Fire-and-forget submission of uploaded audio to the external analysis
//! endpoint. The request path only enqueues; a background worker owns the
//! HTTP client and logs failures. Dispatch outcome never reaches the caller —
//! the record stays ANALYZING until the classifier calls back.

use std::path::PathBuf;
use std::time::Duration;

use tbvector_common::{Error, Result};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One pending classifier submission
#[derive(Debug)]
pub struct ClassifierJob {
    /// Guid of the freshly created cough event
    pub record_id: String,
    /// Display name of the submitting device or user
    pub submitter_name: String,
    /// Absolute path of the stored audio blob
    pub audio_path: PathBuf,
    /// Filename presented in the multipart part
    pub file_name: String,
}

/// Queue handle for classifier dispatch
#[derive(Clone)]
pub struct ClassifierHandle {
    tx: mpsc::UnboundedSender<ClassifierJob>,
}

impl ClassifierHandle {
    /// Build the HTTP client and spawn the dispatch worker
    pub fn spawn(endpoint: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build classifier client: {}", e)))?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(rx, client, endpoint));
        Ok(Self { tx })
    }

    /// Enqueue a submission without waiting for its outcome
    pub fn enqueue(&self, job: ClassifierJob) {
        if self.tx.send(job).is_err() {
            warn!("Classifier dispatch queue is closed; dropping job");
        }
    }
}

/// Worker loop: drains the queue until all handles are dropped
async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<ClassifierJob>,
    client: reqwest::Client,
    endpoint: String,
) {
    debug!("Classifier dispatch worker started");
    while let Some(job) = rx.recv().await {
        let record_id = job.record_id.clone();
        if let Err(e) = dispatch(&client, &endpoint, job).await {
            warn!(record_id = %record_id, "Classifier dispatch failed: {}", e);
        }
    }
    debug!("Classifier dispatch worker stopped");
}

async fn dispatch(client: &reqwest::Client, endpoint: &str, job: ClassifierJob) -> Result<()> {
    let bytes = tokio::fs::read(&job.audio_path).await?;

    let part = reqwest::multipart::Part::bytes(bytes).file_name(job.file_name);
    let form = reqwest::multipart::Form::new()
        .part("audio", part)
        .text("name", job.submitter_name)
        .text("record_id", job.record_id.clone());

    let response = client
        .post(endpoint)
        .multipart(form)
        .send()
        .await
        .map_err(|e| Error::Internal(format!("request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::Internal(format!(
            "classifier returned HTTP {}",
            response.status()
        )));
    }

    debug!(record_id = %job.record_id, "Audio dispatched to classifier");
    Ok(())
}
