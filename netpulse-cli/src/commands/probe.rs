// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `netpulse probe` command - run one probe against an echo peer.

use std::sync::Arc;

use anyhow::Context;
use netpulse_core::{
    DirBlobStore, Port, ProbeRequest, ProbeSettings, Prober, RequestId, RttSummary,
    SampleRecorder, SettingsLoader,
};

use crate::ProbeArgs;

pub fn execute(args: &ProbeArgs) -> anyhow::Result<()> {
    let settings = match &args.config {
        Some(path) => SettingsLoader::load_file(path).context("loading settings file")?,
        None => ProbeSettings::default(),
    };

    let request_id = RequestId::new(args.request_id.as_str())?;
    let mut request = ProbeRequest::new(request_id, args.address.as_str(), Port::new(args.port)?)?;
    request.repetitions = args.repetitions;
    request.debug = args.debug;
    request.listen_port = match args.listen_port {
        Some(port) => Some(Port::new(port)?),
        None => None,
    };

    let store = DirBlobStore::new(&args.output).context("opening artifact store")?;
    let recorder = SampleRecorder::new(Arc::new(store), args.bucket.as_str());
    let prober = Prober::new(settings, recorder);

    let outcome = prober.run(&request);

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if let Some(summary) = &outcome.rtt_summary {
        println!();
        println!("Round-trip summary ({} samples):", summary.count);
        println!("  min:    {}", RttSummary::format_latency(summary.min_ns));
        println!("  median: {}", RttSummary::format_latency(summary.median_ns));
        println!("  p95:    {}", RttSummary::format_latency(summary.p95_ns));
        println!("  max:    {}", RttSummary::format_latency(summary.max_ns));
    }

    Ok(())
}
