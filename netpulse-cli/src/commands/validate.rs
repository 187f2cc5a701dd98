// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `netpulse validate` command - Validate a settings file.

use netpulse_core::SettingsLoader;

pub fn execute(file: &str) -> anyhow::Result<()> {
    tracing::info!(file = %file, "Validating settings");

    match SettingsLoader::load_file(file) {
        Ok(settings) => {
            println!("✓ Settings are valid");
            println!();
            println!("Probe Settings:");
            println!(
                "  Probe Timeout:     {}ms",
                settings.probe_timeout.as_millis()
            );
            println!(
                "  Steady Timeout:    {}ms",
                settings.steady_timeout.as_millis()
            );
            println!("  Failure Threshold: {}", settings.failure_threshold);
            println!("  Attempt Cap:       {}", settings.max_attempts);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Settings validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
