/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Funny Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 *
 * 1. OPEN SOURCE: You may use this file under the terms of the GNU Affero
 * General Public License v3.0. If you link to this code, your ENTIRE
 * application must be open-sourced under AGPLv3.
 *
 * 2. COMMERCIAL: For proprietary use, you must obtain a Commercial License
 * from Sovereign Systems.
 *
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 * NO IMPLIED LICENSE to rights of Mohamad Al-Zawahreh or Sovereign Systems.
 */

use std::sync::Once;

static INIT: Once = Once::new();

const DEFAULT_FILTER: &str = "info";

/// Install the global `tracing` subscriber.
///
/// `level` is an `EnvFilter` directive ("debug", "funny_core=trace", ...).
/// Without it `RUST_LOG` is used, then `info`. Later calls are no-ops, as is
/// any call made after another subscriber was installed.
pub fn init_with_level(level: Option<&str>) {
    INIT.call_once(|| {
        if tracing::dispatcher::has_been_set() {
            return;
        }

        let directive = match level {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string()),
        };

        let filter = tracing_subscriber::EnvFilter::try_new(&directive).unwrap_or_else(|e| {
            eprintln!("WARN: invalid log filter '{directive}': {e}; using '{DEFAULT_FILTER}'");
            tracing_subscriber::EnvFilter::new(DEFAULT_FILTER)
        });

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_with_level(Some("not a [valid filter"));
        init_with_level(Some("debug"));
        tracing::info!("logging initialised twice without panicking");
    }
}
