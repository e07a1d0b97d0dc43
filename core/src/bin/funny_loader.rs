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

use funny_core::config::CodegenOptions;
use funny_core::loader::load_module_file;
use funny_core::logging;
use funny_core::pipeline::{Pipeline, PipelineError};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const USAGE: &str = "Usage: funny_loader <module.json> [--source file] [--config file] \
                     [--out file.wasm] [--log level] [--invoke name args...]";

#[derive(Debug, Default)]
struct CliArgs {
    module: PathBuf,
    source: Option<PathBuf>,
    config: Option<PathBuf>,
    out: Option<PathBuf>,
    log: Option<String>,
    invoke: Option<(String, Vec<i32>)>,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();
    let mut module = None;
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| iter.next().cloned().ok_or_else(|| format!("{} needs a value", flag));
        match arg.as_str() {
            "--source" => cli.source = Some(PathBuf::from(value("--source")?)),
            "--config" => cli.config = Some(PathBuf::from(value("--config")?)),
            "--out" => cli.out = Some(PathBuf::from(value("--out")?)),
            "--log" => cli.log = Some(value("--log")?),
            "--invoke" => {
                let name = value("--invoke")?;
                // Everything after the export name is an argument.
                let call_args = iter
                    .by_ref()
                    .map(|a| a.parse::<i32>().map_err(|e| format!("Bad argument '{}': {}", a, e)))
                    .collect::<Result<Vec<_>, _>>()?;
                cli.invoke = Some((name, call_args));
            }
            flag if flag.starts_with("--") => return Err(format!("Unknown option '{}'", flag)),
            path if module.is_none() => module = Some(PathBuf::from(path)),
            extra => return Err(format!("Unexpected argument '{}'", extra)),
        }
    }

    cli.module = module.ok_or_else(|| USAGE.to_string())?;
    Ok(cli)
}

fn read_text(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
}

#[cfg(not(target_arch = "wasm32"))]
fn invoke(bytes: &[u8], name: &str, args: &[i32]) -> Result<(), String> {
    let mut instance = funny_core::wasm_runner::FunnyInstance::instantiate(bytes).map_err(|e| e.to_string())?;
    let results = instance.call(name, args).map_err(|e| e.to_string())?;
    println!("{}({:?}) = {:?}", name, args, results);
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn invoke(_bytes: &[u8], _name: &str, _args: &[i32]) -> Result<(), String> {
    Err("--invoke is not available on wasm32 hosts".to_string())
}

fn run(cli: CliArgs) -> Result<(), String> {
    let module = load_module_file(&cli.module).map_err(|e| format!("Load Error: {}", e))?;
    let source = match &cli.source {
        Some(path) => read_text(path)?,
        None => String::new(),
    };
    let options = match &cli.config {
        Some(path) => CodegenOptions::from_file(path).map_err(|e| e.to_string())?,
        None => CodegenOptions::default(),
    };

    let mut pipeline = Pipeline::new(options);
    let compiled = match pipeline.build(&module, &source) {
        Ok(compiled) => compiled,
        // Diagnostics go out as JSON for editor tooling.
        Err(PipelineError::Semantic(e)) => return Err(e.to_json()),
        Err(e) => return Err(e.to_string()),
    };

    for unused in pipeline.unused_variables() {
        eprintln!("warning: {} '{}' in '{}' is never read", unused.origin, unused.name, unused.function);
    }
    println!(
        "Compiled {} function(s), {} bytes, sha256 {}",
        compiled.exports.len(),
        compiled.bytes.len(),
        compiled.digest
    );

    if let Some(out) = &cli.out {
        fs::write(out, &compiled.bytes).map_err(|e| format!("Failed to write {}: {}", out.display(), e))?;
        println!("Wrote {}", out.display());
    }

    if let Some((name, args)) = &cli.invoke {
        invoke(&compiled.bytes, name, args)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    logging::init_with_level(cli.log.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
