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

use crate::ast::Module;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("JSON Parse Error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("IO Error: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Integrity Error: Digest Mismatch. Expected {expected}, computed {computed}.")]
    DigestMismatch { expected: String, computed: String },
}

/// A module together with the digest it was sealed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedModule {
    pub digest: String,
    pub module: Module,
}

impl SignedModule {
    pub fn seal(module: Module) -> Result<Self, LoadError> {
        let digest = module_digest(&module)?;
        Ok(SignedModule { digest, module })
    }

    pub fn verify(&self) -> Result<(), LoadError> {
        let computed = module_digest(&self.module)?;
        if computed != self.digest {
            return Err(LoadError::DigestMismatch {
                expected: self.digest.clone(),
                computed,
            });
        }
        Ok(())
    }
}

/// SHA-256 over the canonical JSON of `module`, hex encoded.
pub fn module_digest(module: &Module) -> Result<String, LoadError> {
    let canonical = serde_json::to_vec(module)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

/// Parse the parser's JSON output.
///
/// Accepts a bare module (`{"functions": [...]}`) or a sealed one
/// (`{"digest": "...", "module": {...}}`), whose digest is checked.
pub fn load_module(json: &str) -> Result<Module, LoadError> {
    let value: serde_json::Value = serde_json::from_str(json)?;

    if value.get("module").is_some() {
        let signed: SignedModule = serde_json::from_value(value)?;
        signed.verify()?;
        debug!(digest = %signed.digest, "sealed module verified");
        return Ok(signed.module);
    }

    Ok(serde_json::from_value(value)?)
}

pub fn load_module_file(path: &Path) -> Result<Module, LoadError> {
    let json = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_module(&json)
}
