// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt::Write;

use sha2::{Digest, Sha256};

/// Computes the SHA-256 of a DER-encoded certificate and renders it in the
/// colon-delimited lowercase hex form used for pinning, e.g.
/// `ab:01:ff:…` (32 pairs).
pub fn cert_fingerprint(der: &[u8]) -> String {
    let digest = Sha256::digest(der);
    let mut out = String::with_capacity(digest.len() * 3);
    for byte in digest {
        if !out.is_empty() {
            out.push(':');
        }
        write!(&mut out, "{byte:02x}").expect("Writing to String cannot fail");
    }
    out
}

/// Strips colons and whitespace from a configured fingerprint and lowercases
/// it, so pinned values compare equal regardless of formatting.
pub fn normalize_fingerprint(fp: &str) -> String {
    fp.chars()
        .filter(|c| !matches!(c, ':' | ' ' | '\t'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// True when a configured pin matches a computed colon-hex fingerprint.
pub fn fingerprint_matches(pinned: &str, computed: &str) -> bool {
    normalize_fingerprint(pinned) == normalize_fingerprint(computed)
}
