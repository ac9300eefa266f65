// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ingress sniffer — verifies the leading bytes of an upload against the JPEG
// signature before anything downstream consumes the stream.
//
// The sniffer owns a push-back buffer rather than mutating the underlying
// stream: `PeekReader::peek` pulls bytes into the buffer without handing them
// out, and the `AsyncRead` impl replays that buffer exactly once, in order,
// before reading further from the inner source.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use pagewright_core::error::{PagewrightError, Result};
use pagewright_core::types::DocumentType;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tracing::{debug, instrument};

/// JPEG start-of-image marker.
pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Forward-only reader with a bounded, replayable prefix.
pub struct PeekReader<R> {
    inner: R,
    /// Bytes pulled from `inner` but not yet handed to a consumer.
    pending: Vec<u8>,
    /// Read offset into `pending`.
    pos: usize,
}

impl<R: AsyncRead + Unpin> PeekReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            pos: 0,
        }
    }

    /// Return up to `n` upcoming bytes without consuming them.
    ///
    /// Fewer than `n` bytes are returned only when the source ends first.
    pub async fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        while self.pending.len() - self.pos < n {
            let start = self.pending.len();
            let want = n - (start - self.pos);
            self.pending.resize(start + want, 0);
            let read = self.inner.read(&mut self.pending[start..]).await;
            match read {
                Ok(count) => {
                    self.pending.truncate(start + count);
                    if count == 0 {
                        break;
                    }
                }
                Err(err) => {
                    self.pending.truncate(start);
                    return Err(err);
                }
            }
        }
        let end = (self.pos + n).min(self.pending.len());
        Ok(&self.pending[self.pos..end])
    }

    /// Number of peeked bytes still waiting to be replayed.
    pub fn buffered(&self) -> usize {
        self.pending.len() - self.pos
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for PeekReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.pos < this.pending.len() {
            let count = (this.pending.len() - this.pos).min(out.remaining());
            out.put_slice(&this.pending[this.pos..this.pos + count]);
            this.pos += count;
            if this.pos == this.pending.len() {
                this.pending.clear();
                this.pos = 0;
            }
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut this.inner).poll_read(cx, out)
    }
}

/// The verified leading bytes of an upload plus its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureProbe {
    prefix: Vec<u8>,
    declared: DocumentType,
}

impl SignatureProbe {
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub fn declared(&self) -> DocumentType {
        self.declared
    }
}

/// Verify the declared type and leading bytes of an upload.
///
/// Peeks `sniff_len` bytes from `source`; they remain readable afterwards.
#[instrument(skip(source))]
pub async fn probe<R: AsyncRead + Unpin>(
    source: &mut PeekReader<R>,
    declared: &str,
    sniff_len: usize,
) -> Result<SignatureProbe> {
    // Check the declared type before touching the stream at all.
    let declared_type = check_declared(declared)?;
    let prefix = source
        .peek(sniff_len)
        .await
        .map_err(PagewrightError::from_upload_io)?;
    let probe = probe_bytes(prefix, declared_type)?;
    debug!(prefix_len = probe.prefix.len(), "signature verified");
    Ok(probe)
}

/// Verify an already-captured prefix.
pub fn probe_bytes(prefix: &[u8], declared: DocumentType) -> Result<SignatureProbe> {
    if !prefix.starts_with(&JPEG_SOI) {
        return Err(PagewrightError::SignatureMismatch(format!(
            "leading bytes {} are not a JPEG start-of-image marker",
            hex::encode(&prefix[..prefix.len().min(JPEG_SOI.len())])
        )));
    }
    Ok(SignatureProbe {
        prefix: prefix.to_vec(),
        declared,
    })
}

fn check_declared(declared: &str) -> Result<DocumentType> {
    match DocumentType::from_declared(declared) {
        Some(DocumentType::Jpeg) => Ok(DocumentType::Jpeg),
        _ => Err(PagewrightError::SignatureMismatch(format!(
            "declared type {declared:?} is not image/jpeg"
        ))),
    }
}
