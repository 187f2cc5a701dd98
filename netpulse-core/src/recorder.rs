// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CSV export of the recorded sample series.
//!
//! The recorder's responsibility ends at producing the serialized bytes and
//! handing them to the storage collaborator; a failed upload is logged and
//! never invalidates the measurement itself.

use std::sync::Arc;

use crate::sample::ProbeSample;
use crate::storage::BlobStore;
use crate::types::RequestId;

/// Key reported when no artifact was produced.
pub const PLACEHOLDER_KEY: &str = "filename_tmp";

const CSV_HEADER: &str = "id,client_send,client_rcv";

/// Serializes probe samples and routes the artifact to blob storage.
pub struct SampleRecorder {
    store: Arc<dyn BlobStore>,
    bucket: String,
}

impl SampleRecorder {
    pub fn new(store: Arc<dyn BlobStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Export the sample series, returning the artifact key.
    ///
    /// Without `debug` no artifact is produced and the placeholder key is
    /// returned. The generated key is returned even when the upload fails.
    pub fn export(&self, request_id: &RequestId, samples: &[ProbeSample], debug: bool) -> String {
        if !debug {
            return PLACEHOLDER_KEY.to_string();
        }

        let key = format!(
            "clock-synchronization-benchmark-results-{}.csv",
            request_id
        );
        let bytes = serialize_csv(samples);

        match self.store.put(&self.bucket, &key, &bytes) {
            Ok(()) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %key,
                    samples = samples.len(),
                    "Sample series uploaded"
                );
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Sample series upload failed");
            }
        }

        key
    }
}

/// One line per sample: `id,client_send,client_rcv`.
fn serialize_csv(samples: &[ProbeSample]) -> Vec<u8> {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + samples.len() * 48);
    out.push_str(CSV_HEADER);
    out.push('\n');

    for sample in samples {
        out.push_str(&format!(
            "{},{},{}\n",
            sample.attempt_index, sample.send_timestamp_nanos, sample.receive_timestamp_nanos
        ));
    }

    out.into_bytes()
}
