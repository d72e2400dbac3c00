// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background conversion — run the pipeline off the UI thread and stream its
// progress back over a channel.

use std::path::PathBuf;
use std::sync::Arc;

use folio_core::error::{FolioError, Result};
use folio_core::types::{ConversionParameters, ConversionSummary, Progress};
use folio_document::PageRasterizer;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};

use crate::pipeline::Pipeline;
use crate::worklist::WorklistSnapshot;

/// Everything one conversion needs, detached from the session.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub snapshot: WorklistSnapshot,
    pub params: ConversionParameters,
    pub destination: PathBuf,
}

/// Run `job` on tokio's blocking pool.
///
/// Progress goes to `progress_tx` after every output page. A closed receiver
/// does not stop the conversion.
pub async fn run_in_background(
    job: ConversionJob,
    rasterizer: Arc<dyn PageRasterizer>,
    progress_tx: UnboundedSender<Progress>,
) -> Result<ConversionSummary> {
    info!(destination = %job.destination.display(), "Conversion queued");
    let outcome = tokio::task::spawn_blocking(move || {
        Pipeline::new(rasterizer).run(&job.snapshot, &job.params, &job.destination, &mut |p| {
            let _ = progress_tx.send(p);
        })
    })
    .await
    .map_err(|e| FolioError::Worker(format!("conversion task failed: {}", e)))?;

    if let Err(err) = &outcome {
        error!(%err, "Conversion failed");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worklist::{NoPrompt, Worklist};
    use folio_document::NoRasterizer;
    use folio_document::pdf::testing::write_test_image;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn progress_streams_while_converting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut paths = Vec::new();
        for name in ["a.png", "b.png", "c.png"] {
            let path = dir.path().join(name);
            write_test_image(&path, 16, 16);
            paths.push(path);
        }
        let mut list = Worklist::new();
        list.add(paths, &mut NoPrompt);

        let job = ConversionJob {
            snapshot: list.snapshot(),
            params: ConversionParameters::default(),
            destination: dir.path().join("out.pdf"),
        };
        let (tx, mut rx) = unbounded_channel();
        let summary = run_in_background(job, Arc::new(NoRasterizer), tx)
            .await
            .expect("convert");
        assert_eq!(summary.pages, 3);
        assert!(summary.output.exists());

        let mut seen = Vec::new();
        while let Some(p) = rx.recv().await {
            seen.push(p.pages_done);
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn failures_come_back_as_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job = ConversionJob {
            snapshot: WorklistSnapshot::default(),
            params: ConversionParameters::default(),
            destination: dir.path().join("out.pdf"),
        };
        let (tx, _rx) = unbounded_channel();
        let result = run_in_background(job, Arc::new(NoRasterizer), tx).await;
        assert!(matches!(result, Err(FolioError::EmptyWorklist)));
    }
}
