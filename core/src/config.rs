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

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// WebAssembly page size in bytes.
pub const WASM_PAGE_SIZE: u64 = 65536;

const MAX_PAGES_32: u64 = 65536;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config IO Error: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Config Parse Error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid Config: {0}")]
    Invalid(String),
}

/// Knobs of the code generator. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodegenOptions {
    /// Initial linear memory size, in 64 KiB pages.
    pub memory_pages: u64,
    pub max_memory_pages: Option<u64>,
    /// Export the memory as `memory` so the host can place arrays.
    pub export_memory: bool,
    /// Run `wasmparser` over the emitted binary.
    pub validate_output: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            memory_pages: 1,
            max_memory_pages: Some(16),
            export_memory: true,
            validate_output: true,
        }
    }
}

impl CodegenOptions {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let options: CodegenOptions = serde_json::from_str(json)?;
        options.check()?;
        Ok(options)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        if self.memory_pages > MAX_PAGES_32 {
            return Err(ConfigError::Invalid(format!(
                "memoryPages {} exceeds the 32-bit limit of {}",
                self.memory_pages, MAX_PAGES_32
            )));
        }
        if let Some(max) = self.max_memory_pages {
            if max > MAX_PAGES_32 {
                return Err(ConfigError::Invalid(format!(
                    "maxMemoryPages {} exceeds the 32-bit limit of {}",
                    max, MAX_PAGES_32
                )));
            }
            if max < self.memory_pages {
                return Err(ConfigError::Invalid(format!(
                    "maxMemoryPages {} is below memoryPages {}",
                    max, self.memory_pages
                )));
            }
        }
        Ok(())
    }

    /// Bytes available to the host for array data.
    pub fn memory_bytes(&self) -> u64 {
        self.memory_pages * WASM_PAGE_SIZE
    }
}
