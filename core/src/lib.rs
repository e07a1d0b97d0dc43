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

pub mod ast;
pub mod checker;
pub mod config;
pub mod diagnostic;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod resolver;
pub mod types;
pub mod wasm_codegen;
#[cfg(not(target_arch = "wasm32"))]
pub mod wasm_runner;

pub use checker::validate;
pub use diagnostic::{ErrorKind, FunnyError};
pub use pipeline::{Pipeline, PipelineError};
pub use resolver::resolve;
pub use wasm_codegen::{CompiledModule, WasmCodegen};
