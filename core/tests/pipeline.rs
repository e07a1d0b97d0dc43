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

//! End-to-end: JSON module -> checker -> resolver -> WebAssembly -> wasmtime.

use funny_core::ast::*;
use funny_core::loader::load_module;
use funny_core::wasm_runner::FunnyInstance;
use funny_core::{ErrorKind, Pipeline, PipelineError};

fn build(module: &Module) -> FunnyInstance {
    let compiled = Pipeline::default().build(module, "").expect("build failed");
    FunnyInstance::instantiate(&compiled.bytes).expect("instantiate failed")
}

fn func(
    name: &str,
    parameters: Vec<VarDecl>,
    returns: Vec<VarDecl>,
    locals: Vec<VarDecl>,
    body: Vec<Statement>,
) -> FunctionDef {
    FunctionDef {
        name: name.to_string(),
        parameters,
        returns,
        locals,
        requires: None,
        ensures: None,
        body: Statement::block(body),
    }
}

fn inc(name: &str) -> Statement {
    Statement::assign(name, Expr::binary(ArithOp::Add, Expr::var(name), Expr::num(1)))
}

#[test]
fn test_add_from_json_round_trip() {
    let json = r#"{
        "functions": [{
            "name": "f",
            "parameters": [
                { "name": "a", "varType": "int" },
                { "name": "b", "varType": "int" }
            ],
            "returns": [{ "name": "r", "varType": "int" }],
            "body": {
                "type": "block",
                "statements": [{
                    "type": "assign",
                    "kind": "simple",
                    "targets": ["r"],
                    "value": {
                        "type": "binary",
                        "op": "+",
                        "left": { "type": "var", "name": "a" },
                        "right": { "type": "var", "name": "b" }
                    }
                }]
            }
        }]
    }"#;
    let compiled = Pipeline::default().build_json(json, "").unwrap();
    let mut instance = FunnyInstance::instantiate(&compiled.bytes).unwrap();
    assert_eq!(instance.call("f", &[2, 3]).unwrap(), vec![5]);
    assert_eq!(instance.call("f", &[i32::MAX, 1]).unwrap(), vec![i32::MIN]);
}

#[test]
fn test_tuple_returns_across_calls() {
    let module = Module {
        functions: vec![
            func(
                "main",
                vec![VarDecl::int("a"), VarDecl::int("b")],
                vec![VarDecl::int("sum")],
                vec![VarDecl::int("q"), VarDecl::int("r")],
                vec![
                    Statement::assign_tuple(
                        &["q", "r"],
                        FunctionCall::new("divmod", vec![Expr::var("a"), Expr::var("b")]),
                    ),
                    Statement::assign(
                        "sum",
                        Expr::binary(
                            ArithOp::Add,
                            Expr::binary(ArithOp::Mul, Expr::var("q"), Expr::num(100)),
                            Expr::var("r"),
                        ),
                    ),
                ],
            ),
            func(
                "divmod",
                vec![VarDecl::int("a"), VarDecl::int("b")],
                vec![VarDecl::int("q"), VarDecl::int("r")],
                vec![],
                vec![
                    Statement::assign("q", Expr::binary(ArithOp::Div, Expr::var("a"), Expr::var("b"))),
                    Statement::assign(
                        "r",
                        Expr::binary(
                            ArithOp::Sub,
                            Expr::var("a"),
                            Expr::binary(ArithOp::Mul, Expr::var("q"), Expr::var("b")),
                        ),
                    ),
                ],
            ),
        ],
    };
    let mut instance = build(&module);
    assert_eq!(instance.call("divmod", &[17, 5]).unwrap(), vec![3, 2]);
    assert_eq!(instance.call("main", &[17, 5]).unwrap(), vec![302]);
}

#[test]
fn test_array_sum_through_memory() {
    let module = Module {
        functions: vec![func(
            "sum",
            vec![VarDecl::array("a"), VarDecl::int("n")],
            vec![VarDecl::int("s")],
            vec![VarDecl::int("i")],
            vec![Statement::while_loop(
                Condition::compare(CompareOp::Lt, Expr::var("i"), Expr::var("n")),
                Statement::block(vec![
                    Statement::assign(
                        "s",
                        Expr::binary(ArithOp::Add, Expr::var("s"), Expr::index("a", Expr::var("i"))),
                    ),
                    inc("i"),
                ]),
            )],
        )],
    };
    let mut instance = build(&module);
    instance.write_array(0, &[3, -1, 4, 1, -5, 9]).unwrap();
    assert_eq!(instance.call("sum", &[0, 6]).unwrap(), vec![11]);
    assert_eq!(instance.call("sum", &[8, 2]).unwrap(), vec![5]);
    assert_eq!(instance.call("sum", &[0, 0]).unwrap(), vec![0]);
}

#[test]
fn test_in_place_reverse() {
    // Parameters are read-only, so the array is a local: a zero-initialised
    // `int[]` slot addresses the start of memory.
    let module = Module {
        functions: vec![func(
            "reverse",
            vec![VarDecl::int("n")],
            vec![],
            vec![VarDecl::array("a"), VarDecl::int("i"), VarDecl::int("j"), VarDecl::int("t")],
            vec![
                Statement::assign("j", Expr::binary(ArithOp::Sub, Expr::var("n"), Expr::num(1))),
                Statement::while_loop(
                    Condition::compare(CompareOp::Lt, Expr::var("i"), Expr::var("j")),
                    Statement::block(vec![
                        Statement::assign("t", Expr::index("a", Expr::var("i"))),
                        Statement::assign_index("a", Expr::var("i"), Expr::index("a", Expr::var("j"))),
                        Statement::assign_index("a", Expr::var("j"), Expr::var("t")),
                        inc("i"),
                        Statement::assign("j", Expr::binary(ArithOp::Sub, Expr::var("j"), Expr::num(1))),
                    ]),
                ),
            ],
        )],
    };
    let mut instance = build(&module);
    instance.write_array(0, &[1, 2, 3, 4, 5]).unwrap();
    assert!(instance.call("reverse", &[5]).unwrap().is_empty());
    assert_eq!(instance.read_array(0, 5).unwrap(), vec![5, 4, 3, 2, 1]);
}

#[test]
fn test_recursive_factorial() {
    let module = Module {
        functions: vec![func(
            "fact",
            vec![VarDecl::int("n")],
            vec![VarDecl::int("r")],
            vec![],
            vec![Statement::if_else(
                Condition::compare(CompareOp::Le, Expr::var("n"), Expr::num(1)),
                Statement::assign("r", Expr::num(1)),
                Some(Statement::assign(
                    "r",
                    Expr::binary(
                        ArithOp::Mul,
                        Expr::var("n"),
                        Expr::call("fact", vec![Expr::binary(ArithOp::Sub, Expr::var("n"), Expr::num(1))]),
                    ),
                )),
            )],
        )],
    };
    let mut instance = build(&module);
    assert_eq!(instance.call("fact", &[5]).unwrap(), vec![120]);
    assert_eq!(instance.call("fact", &[0]).unwrap(), vec![1]);
}

#[test]
fn test_division_by_zero_traps() {
    let module = Module {
        functions: vec![func(
            "div",
            vec![VarDecl::int("a"), VarDecl::int("b")],
            vec![VarDecl::int("q")],
            vec![],
            vec![Statement::assign("q", Expr::binary(ArithOp::Div, Expr::var("a"), Expr::var("b")))],
        )],
    };
    let mut instance = build(&module);
    assert_eq!(instance.call("div", &[-9, 2]).unwrap(), vec![-4]);
    let err = instance.call("div", &[1, 0]).unwrap_err();
    assert!(err.is_trap(), "expected trap, got {}", err);
}

#[test]
fn test_connectives_evaluate_one_side() {
    // safe(a, b): r = 1 if (b != 0 and a / b > 1), else 0. With b == 0 the
    // right operand must not run.
    let guarded = Condition::logic(
        LogicOp::And,
        Condition::compare(CompareOp::Ne, Expr::var("b"), Expr::num(0)),
        Condition::compare(
            CompareOp::Gt,
            Expr::binary(ArithOp::Div, Expr::var("a"), Expr::var("b")),
            Expr::num(1),
        ),
    );
    let implied = Condition::logic(
        LogicOp::Implies,
        Condition::compare(CompareOp::Ne, Expr::var("b"), Expr::num(0)),
        Condition::compare(CompareOp::Eq, Expr::var("a"), Expr::var("a")),
    );
    let module = Module {
        functions: vec![
            func(
                "safe",
                vec![VarDecl::int("a"), VarDecl::int("b")],
                vec![VarDecl::int("r")],
                vec![],
                vec![Statement::if_else(guarded, Statement::assign("r", Expr::num(1)), None)],
            ),
            func(
                "imp",
                vec![VarDecl::int("a"), VarDecl::int("b")],
                vec![VarDecl::int("r")],
                vec![],
                vec![Statement::if_else(
                    Condition::logic(
                        LogicOp::Or,
                        Condition::not(implied),
                        Condition::Bool { value: false },
                    ),
                    Statement::assign("r", Expr::num(1)),
                    Some(Statement::assign("r", Expr::num(2))),
                )],
            ),
        ],
    };
    let mut instance = build(&module);
    assert_eq!(instance.call("safe", &[10, 0]).unwrap(), vec![0]);
    assert_eq!(instance.call("safe", &[10, 3]).unwrap(), vec![1]);
    assert_eq!(instance.call("safe", &[2, 3]).unwrap(), vec![0]);
    assert_eq!(instance.call("imp", &[4, 0]).unwrap(), vec![2]);
    assert_eq!(instance.call("imp", &[4, 1]).unwrap(), vec![2]);
}

#[test]
fn test_call_statement_discards_results() {
    let module = Module {
        functions: vec![
            func(
                "store",
                vec![VarDecl::int("v")],
                vec![VarDecl::int("old")],
                vec![VarDecl::array("a")],
                vec![
                    Statement::assign("old", Expr::index("a", Expr::num(0))),
                    Statement::assign_index("a", Expr::num(0), Expr::var("v")),
                ],
            ),
            func(
                "main",
                vec![VarDecl::int("v")],
                vec![],
                vec![],
                vec![Statement::Call {
                    call: FunctionCall::new("store", vec![Expr::var("v")]),
                }],
            ),
        ],
    };
    let mut instance = build(&module);
    instance.write_array(0, &[7]).unwrap();
    assert!(instance.call("main", &[42]).unwrap().is_empty());
    assert_eq!(instance.read_array(0, 1).unwrap(), vec![42]);
    assert_eq!(instance.call("store", &[5]).unwrap(), vec![42]);
}

#[test]
fn test_duplicate_main_from_json() {
    let json = r#"{
        "functions": [
            { "name": "main", "body": { "type": "block", "statements": [] } },
            { "name": "main", "body": { "type": "block", "statements": [] } }
        ]
    }"#;
    let module = load_module(json).unwrap();
    let err = Pipeline::default().build(&module, "main()\n{}\nmain()\n{}").unwrap_err();
    match err {
        PipelineError::Semantic(e) => {
            assert_eq!(e.kind, ErrorKind::DuplicateFunction);
            assert!(e.message.contains("main"));
            assert_eq!(e.span.map(|s| s.start_line), Some(1));
        }
        other => panic!("Expected a semantic error, got {}", other),
    }
}
