// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `netpulse echo` command - serve echoes until the stop sentinel arrives.

use anyhow::Context;
use netpulse_core::EchoResponder;

use crate::EchoArgs;

pub fn execute(args: &EchoArgs) -> anyhow::Result<()> {
    let responder =
        EchoResponder::bind(args.port, args.reply_port).context("binding echo responder")?;

    responder.run().context("serving echoes")?;
    Ok(())
}
