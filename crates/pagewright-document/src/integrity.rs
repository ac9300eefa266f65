// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content fingerprints — SHA-256 digests used to correlate uploads and
// generated documents in logs.

use sha2::{Digest, Sha256};

/// Number of hex characters kept by [`short_fingerprint`].
const SHORT_LEN: usize = 12;

/// Lowercase hex SHA-256 of `data`.
pub fn fingerprint(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Leading characters of the fingerprint, enough to tell uploads apart in a
/// log stream.
pub fn short_fingerprint(data: &[u8]) -> String {
    let mut digest = fingerprint(data);
    digest.truncate(SHORT_LEN);
    digest
}
