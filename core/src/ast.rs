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

//! AST of a Funny module as handed over by the parser.
//!
//! The serde layout (`type` tags, camelCase fields) is the JSON interchange
//! format read by [`crate::loader`].

use crate::types::VarType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Module {
    pub functions: Vec<FunctionDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<VarDecl>,
    #[serde(default)]
    pub returns: Vec<VarDecl>,
    #[serde(default)]
    pub locals: Vec<VarDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<Predicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensures: Option<Predicate>,
    pub body: Statement,
}

impl FunctionDef {
    /// Declarations in slot order: parameters, then returns, then locals.
    pub fn declarations(&self) -> impl Iterator<Item = &VarDecl> {
        self.parameters
            .iter()
            .chain(self.returns.iter())
            .chain(self.locals.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VarDecl {
    pub name: String,
    pub var_type: VarType,
}

impl VarDecl {
    pub fn int(name: &str) -> Self {
        VarDecl {
            name: name.to_string(),
            var_type: VarType::Int,
        }
    }

    pub fn array(name: &str) -> Self {
        VarDecl {
            name: name.to_string(),
            var_type: VarType::IntArray,
        }
    }
}

// =============================================================================
// Statements
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Statement {
    Block {
        statements: Vec<Statement>,
    },
    Assign(Assignment),
    #[serde(rename_all = "camelCase")]
    If {
        condition: Condition,
        then_branch: Box<Statement>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        else_branch: Option<Box<Statement>>,
    },
    While {
        condition: Condition,
        body: Box<Statement>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invariant: Option<Predicate>,
    },
    /// A call evaluated for its effect; every result is discarded.
    #[serde(rename = "callStmt")]
    Call {
        call: FunctionCall,
    },
}

impl Statement {
    pub fn block(statements: Vec<Statement>) -> Self {
        Statement::Block { statements }
    }

    pub fn assign(target: &str, value: Expr) -> Self {
        Statement::Assign(Assignment {
            kind: AssignKind::Simple,
            targets: vec![target.to_string()],
            indices: Vec::new(),
            value,
        })
    }

    pub fn assign_index(target: &str, index: Expr, value: Expr) -> Self {
        Statement::Assign(Assignment {
            kind: AssignKind::Array,
            targets: vec![target.to_string()],
            indices: vec![index],
            value,
        })
    }

    pub fn assign_tuple(targets: &[&str], call: FunctionCall) -> Self {
        Statement::Assign(Assignment {
            kind: AssignKind::Tuple,
            targets: targets.iter().map(|t| t.to_string()).collect(),
            indices: Vec::new(),
            value: Expr::Call(call),
        })
    }

    pub fn if_else(condition: Condition, then_branch: Statement, else_branch: Option<Statement>) -> Self {
        Statement::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        }
    }

    pub fn while_loop(condition: Condition, body: Statement) -> Self {
        Statement::While {
            condition,
            body: Box::new(body),
            invariant: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "camelCase")]
pub enum AssignKind {
    /// `x = e;`
    Simple,
    /// `a[i] = e;`
    Array,
    /// `x, y = f(...);`
    Tuple,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub kind: AssignKind,
    pub targets: Vec<String>,
    /// Index expressions; only `kind == Array` carries one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<Expr>,
    pub value: Expr,
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Expr {
    Num {
        value: i32,
    },
    Var {
        name: String,
    },
    Binary {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Neg {
        argument: Box<Expr>,
    },
    Call(FunctionCall),
    ArrayAccess {
        name: String,
        index: Box<Expr>,
    },
}

impl Expr {
    pub fn num(value: i32) -> Self {
        Expr::Num { value }
    }

    pub fn var(name: &str) -> Self {
        Expr::Var {
            name: name.to_string(),
        }
    }

    pub fn binary(op: ArithOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn neg(argument: Expr) -> Self {
        Expr::Neg {
            argument: Box::new(argument),
        }
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        Expr::Call(FunctionCall::new(name, args))
    }

    pub fn index(name: &str, index: Expr) -> Self {
        Expr::ArrayAccess {
            name: name.to_string(),
            index: Box::new(index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum ArithOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Expr>,
}

impl FunctionCall {
    pub fn new(name: &str, args: Vec<Expr>) -> Self {
        FunctionCall {
            name: name.to_string(),
            args,
        }
    }
}

// =============================================================================
// Conditions & Predicates
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum CompareOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum LogicOp {
    #[serde(rename = "and")]
    And,
    #[serde(rename = "or")]
    Or,
    #[serde(rename = "->")]
    Implies,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub op: CompareOp,
    pub left: Expr,
    pub right: Expr,
}

/// Run-time boolean condition of `if` and `while`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Condition {
    Bool {
        value: bool,
    },
    Comp(Comparison),
    Not {
        argument: Box<Condition>,
    },
    BinCond {
        op: LogicOp,
        left: Box<Condition>,
        right: Box<Condition>,
    },
}

impl Condition {
    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Condition::Comp(Comparison { op, left, right })
    }

    pub fn not(argument: Condition) -> Self {
        Condition::Not {
            argument: Box::new(argument),
        }
    }

    pub fn logic(op: LogicOp, left: Condition, right: Condition) -> Self {
        Condition::BinCond {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "camelCase")]
pub enum QuantifierKind {
    Forall,
    Exists,
}

/// Logical formula of a contract (`requires`, `ensures`, `invariant`).
/// Checked for scoping only, never evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Predicate {
    Bool {
        value: bool,
    },
    Comp(Comparison),
    Not {
        argument: Box<Predicate>,
    },
    BinPred {
        op: LogicOp,
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
    Quantifier {
        quantifier: QuantifierKind,
        variable: VarDecl,
        body: Box<Predicate>,
    },
    /// Reference to an externally defined formula; the name is not resolved.
    FormulaRef {
        name: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
}

impl Predicate {
    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Predicate::Comp(Comparison { op, left, right })
    }

    pub fn not(argument: Predicate) -> Self {
        Predicate::Not {
            argument: Box::new(argument),
        }
    }

    pub fn logic(op: LogicOp, left: Predicate, right: Predicate) -> Self {
        Predicate::BinPred {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn forall(variable: VarDecl, body: Predicate) -> Self {
        Predicate::Quantifier {
            quantifier: QuantifierKind::Forall,
            variable,
            body: Box::new(body),
        }
    }

    pub fn exists(variable: VarDecl, body: Predicate) -> Self {
        Predicate::Quantifier {
            quantifier: QuantifierKind::Exists,
            variable,
            body: Box::new(body),
        }
    }
}
