// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline orchestrator — runs sniff, normalize and compose for one request.
//
// A `Conversion` is created per request once a slot is free under the
// service-wide semaphore. It owns the upload buffer, walks the stage machine
// `Received -> Sniffed -> Normalized -> Composed -> Done`, and records
// `Failed(kind)` on the first error. Everything it holds is dropped with it,
// so an abandoned request (client gone, handler future dropped) releases its
// buffers and its slot without any explicit cleanup path.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pagewright_core::error::{PagewrightError, Result};
use pagewright_core::human_errors::{self, Severity};
use pagewright_core::types::{ConversionId, ConversionStage, DocumentType, OutputName};
use pagewright_core::ServiceConfig;
use pagewright_document::integrity;
use pagewright_document::{Composer, Normalizer, OutputDocument, PeekReader, sniff};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, error, info, warn};

/// Marker carried inside an `io::Error` when the HTTP layer cut the body off
/// at its size limit.
#[derive(Debug, thiserror::Error)]
#[error("request body exceeds the configured limit")]
pub struct BodyLimitExceeded;

/// A finished conversion, ready to send.
#[derive(Debug)]
pub struct ConvertedDocument {
    pub id: ConversionId,
    pub name: OutputName,
    pub document: OutputDocument,
}

/// Shared, stateless conversion service. One per process.
pub struct Pipeline {
    config: Arc<ServiceConfig>,
    normalizer: Normalizer,
    composer: Composer,
    permits: Arc<Semaphore>,
}

impl Pipeline {
    pub fn new(config: Arc<ServiceConfig>) -> Self {
        Self {
            normalizer: Normalizer::from_config(&config),
            composer: Composer::new(config.paper_size),
            permits: Arc::new(Semaphore::new(config.max_concurrent_conversions)),
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Conversion slots currently free.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a conversion slot and open a new conversion.
    ///
    /// Fails with `Overloaded` if no slot frees up within the admission
    /// timeout.
    pub async fn begin(&self) -> Result<Conversion<'_>> {
        let id = ConversionId::new();
        let wait = Duration::from_secs(self.config.admission_timeout_secs);
        let permit = match timeout(wait, Arc::clone(&self.permits).acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return Err(PagewrightError::Internal(
                    "conversion semaphore closed".into(),
                ));
            }
            Err(_) => {
                warn!(conversion = %id, waited_secs = wait.as_secs(), "no conversion slot free");
                return Err(PagewrightError::Overloaded);
            }
        };
        debug!(conversion = %id, "conversion admitted");
        Ok(Conversion {
            pipeline: self,
            id,
            stage: ConversionStage::Received,
            upload: None,
            permit: Arc::new(permit),
        })
    }

    /// Convert a single upload end to end.
    pub async fn convert<R: AsyncRead + Unpin>(
        &self,
        declared: &str,
        source: R,
    ) -> Result<ConvertedDocument> {
        let mut conversion = self.begin().await?;
        conversion.receive(declared, source).await?;
        conversion.finish().await
    }
}

/// One request's pass through the pipeline.
pub struct Conversion<'p> {
    pipeline: &'p Pipeline,
    id: ConversionId,
    stage: ConversionStage,
    upload: Option<Vec<u8>>,
    /// Shared with blocking work so the slot stays taken until that work
    /// actually stops, even if this conversion is dropped first.
    permit: Arc<OwnedSemaphorePermit>,
}

impl Conversion<'_> {
    pub fn stage(&self) -> ConversionStage {
        self.stage
    }

    /// Accept one file part: check its declared type, sniff its signature,
    /// then buffer it up to the upload limit.
    ///
    /// Only one file part is accepted per conversion.
    pub async fn receive<R: AsyncRead + Unpin>(&mut self, declared: &str, source: R) -> Result<()> {
        if self.upload.is_some() {
            return Err(self.fail(PagewrightError::InvalidInput(
                "only one file may be uploaded per request".into(),
            )));
        }
        if self.stage != ConversionStage::Received {
            let stage = self.stage;
            return Err(self.fail(PagewrightError::Internal(format!(
                "upload received in stage {stage:?}"
            ))));
        }
        if DocumentType::from_declared(declared) != Some(DocumentType::Jpeg) {
            return Err(self.fail(PagewrightError::InvalidInput(format!(
                "only JPG images are allowed, got {declared:?}"
            ))));
        }

        let config = self.pipeline.config();
        let (limit, sniff_len) = (config.max_upload_bytes, config.sniff_len);
        let deadline = Instant::now() + Duration::from_secs(config.read_timeout_secs);
        let mut source = PeekReader::new(source);

        match timeout_at(deadline, sniff::probe(&mut source, declared, sniff_len)).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => return Err(self.fail(err)),
            Err(_) => return Err(self.fail(PagewrightError::Timeout)),
        }
        self.advance();

        let mut bytes = Vec::new();
        let mut body = source.take(limit as u64 + 1);
        match timeout_at(deadline, body.read_to_end(&mut bytes)).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => return Err(self.fail(upload_error(err, limit))),
            Err(_) => return Err(self.fail(PagewrightError::Timeout)),
        }
        if bytes.len() > limit {
            return Err(self.fail(PagewrightError::PayloadTooLarge { limit }));
        }

        debug!(conversion = %self.id, bytes = bytes.len(), "upload buffered");
        self.upload = Some(bytes);
        Ok(())
    }

    /// Normalize and compose the received upload.
    pub async fn finish(mut self) -> Result<ConvertedDocument> {
        let Some(upload) = self.upload.take() else {
            return Err(self.fail(PagewrightError::InvalidInput(
                "no file uploaded".into(),
            )));
        };

        info!(
            conversion = %self.id,
            bytes = upload.len(),
            fingerprint = %integrity::short_fingerprint(&upload),
            "converting upload"
        );

        let normalizer = self.pipeline.normalizer;
        let permit = Arc::clone(&self.permit);
        let normalized = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            normalizer.normalize(&upload)
        })
        .await;
        let raster = match flatten(normalized) {
            Ok(raster) => raster,
            Err(err) => return Err(self.fail(err)),
        };
        self.advance();

        let name = OutputName::generate(Utc::now(), &self.id);
        let title = name.stem().to_owned();
        let composer = self.pipeline.composer;
        let permit = Arc::clone(&self.permit);
        let composed = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            composer.compose(&raster, &title)
        })
        .await;
        let document = match flatten(composed) {
            Ok(document) => document,
            Err(err) => return Err(self.fail(err)),
        };
        self.advance();
        self.complete();

        info!(
            conversion = %self.id,
            file = %name.file_name(),
            output_bytes = document.len(),
            "conversion complete"
        );
        Ok(ConvertedDocument {
            id: self.id,
            name,
            document,
        })
    }

    /// Record `err` as this conversion's terminal failure and hand it back.
    pub fn fail(&mut self, err: PagewrightError) -> PagewrightError {
        let kind = err.kind();
        let from = self.stage;
        self.stage = ConversionStage::Failed(kind);
        let human = human_errors::describe(&err);
        let retriable = human.retriable;
        match human.severity {
            Severity::CallerFault => {
                info!(conversion = %self.id, ?from, code = kind.code(), retriable, error = %err, "conversion rejected");
            }
            Severity::Transient => {
                warn!(conversion = %self.id, ?from, code = kind.code(), retriable, error = %err, "conversion deferred");
            }
            Severity::ServerFault => {
                error!(conversion = %self.id, ?from, code = kind.code(), retriable, error = %err, "conversion failed");
            }
        }
        err
    }

    /// Mark a composed conversion as delivered.
    fn complete(&mut self) {
        debug!(conversion = %self.id, from = ?self.stage, to = ?ConversionStage::Done, "stage");
        self.stage = ConversionStage::Done;
    }

    fn advance(&mut self) {
        if let Some(next) = self.stage.next() {
            debug!(conversion = %self.id, from = ?self.stage, to = ?next, "stage");
            self.stage = next;
        }
    }
}

impl Drop for Conversion<'_> {
    fn drop(&mut self) {
        if !self.stage.is_terminal() {
            debug!(conversion = %self.id, stage = ?self.stage, "conversion abandoned");
        }
    }
}

/// Classify a read error on the upload body.
fn upload_error(err: io::Error, limit: usize) -> PagewrightError {
    let over_limit = err
        .get_ref()
        .is_some_and(|inner| inner.is::<BodyLimitExceeded>());
    if over_limit {
        PagewrightError::PayloadTooLarge { limit }
    } else {
        PagewrightError::from_upload_io(err)
    }
}

fn flatten<T>(
    joined: std::result::Result<Result<T>, tokio::task::JoinError>,
) -> Result<T> {
    joined.map_err(|err| PagewrightError::Internal(format!("conversion task failed: {err}")))?
}
