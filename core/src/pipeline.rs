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
use crate::checker::{SemanticChecker, UnusedVariable};
use crate::config::CodegenOptions;
use crate::diagnostic::FunnyError;
use crate::loader::{load_module, module_digest, LoadError};
use crate::resolver::ContractResolver;
use crate::wasm_codegen::{CompiledModule, WasmCodegen, WasmCompileError};
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Semantic(#[from] FunnyError),
    #[error(transparent)]
    Codegen(#[from] WasmCompileError),
}

impl PipelineError {
    /// The user-facing diagnostic, if this is a semantic or contract error.
    pub fn diagnostic(&self) -> Option<&FunnyError> {
        match self {
            PipelineError::Semantic(e) => Some(e),
            _ => None,
        }
    }
}

/// Validate, resolve, compile.
pub struct Pipeline {
    options: CodegenOptions,
    unused: Vec<UnusedVariable>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(CodegenOptions::default())
    }
}

impl Pipeline {
    pub fn new(options: CodegenOptions) -> Self {
        Pipeline {
            options,
            unused: Vec::new(),
        }
    }

    /// Unused variables found by the last `check` or `build`.
    pub fn unused_variables(&self) -> &[UnusedVariable] {
        &self.unused
    }

    /// Front end only: semantic validation, then contract resolution.
    pub fn check(&mut self, module: &Module, source: &str) -> Result<(), FunnyError> {
        self.unused.clear();
        let mut checker = SemanticChecker::new(source);
        checker.check_module(module)?;
        self.unused = checker.unused_variables().to_vec();

        ContractResolver::new(source).resolve_module(module)
    }

    #[instrument(level = "info", skip_all, fields(functions = module.functions.len()))]
    pub fn build(&mut self, module: &Module, source: &str) -> Result<CompiledModule, PipelineError> {
        self.check(module, source)?;
        let compiled = WasmCodegen::new(self.options.clone()).compile(module)?;
        let source_digest = module_digest(module)?;

        info!(
            module = %source_digest,
            binary = %compiled.digest,
            exports = compiled.exports.len(),
            "build finished"
        );
        Ok(compiled)
    }

    /// `build` on the parser's JSON output.
    pub fn build_json(&mut self, json: &str, source: &str) -> Result<CompiledModule, PipelineError> {
        let module = load_module(json)?;
        self.build(&module, source)
    }
}
