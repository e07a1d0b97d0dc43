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
use std::collections::HashMap;
use std::fmt;

/// Type of a Funny variable.
///
/// Arrays carry no length: at run time an `int[]` value is the byte address
/// of its first element in linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum VarType {
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "int[]")]
    IntArray,
}

impl VarType {
    pub fn is_array(&self) -> bool {
        matches!(self, VarType::IntArray)
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Int => write!(f, "int"),
            VarType::IntArray => write!(f, "int[]"),
        }
    }
}

/// Where a name in a function scope was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "camelCase")]
pub enum VarOrigin {
    Param,
    Return,
    Local,
    /// Bound by a `forall`/`exists` quantifier.
    Bound,
}

impl fmt::Display for VarOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarOrigin::Param => write!(f, "Parameter"),
            VarOrigin::Return => write!(f, "Return value"),
            VarOrigin::Local => write!(f, "Local variable"),
            VarOrigin::Bound => write!(f, "Bound variable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeEntry {
    pub origin: VarOrigin,
    pub var_type: VarType,
    pub used: bool,
}

/// Name table for one function, optionally layered over a parent.
///
/// Ordinary statements never open a scope: a function owns one flat table.
/// Only quantifiers layer a child table (holding the bound variable) over it.
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    entries: HashMap<String, ScopeEntry>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Default for Scope<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Scope<'a> {
    pub fn new() -> Self {
        Scope {
            entries: HashMap::new(),
            parent: None,
        }
    }

    pub fn with_parent(parent: &'a Scope<'a>) -> Self {
        Scope {
            entries: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Declare `name` in this layer. On conflict the existing entry is
    /// returned and nothing changes.
    pub fn declare(
        &mut self,
        name: &str,
        origin: VarOrigin,
        var_type: VarType,
    ) -> Result<(), ScopeEntry> {
        if let Some(existing) = self.entries.get(name) {
            return Err(existing.clone());
        }
        self.entries.insert(
            name.to_string(),
            ScopeEntry {
                origin,
                var_type,
                used: false,
            },
        );
        Ok(())
    }

    /// Bind `name` in this layer, hiding any entry of the same name in the
    /// parents.
    pub fn bind(&mut self, name: &str, origin: VarOrigin, var_type: VarType) {
        self.entries.insert(
            name.to_string(),
            ScopeEntry {
                origin,
                var_type,
                used: false,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&ScopeEntry> {
        match self.entries.get(name) {
            Some(entry) => Some(entry),
            None => self.parent.and_then(|p| p.get(name)),
        }
    }

    /// Look up `name` and flag it as read. Only entries of this layer can be
    /// flagged; parents are shared and stay untouched.
    pub fn mark_used(&mut self, name: &str) -> Option<&ScopeEntry> {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.used = true;
            return Some(entry);
        }
        self.parent.and_then(|p| p.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_rejects_repeat() {
        let mut scope = Scope::new();
        assert!(scope.declare("x", VarOrigin::Param, VarType::Int).is_ok());
        let err = scope
            .declare("x", VarOrigin::Local, VarType::IntArray)
            .unwrap_err();
        assert_eq!(err.origin, VarOrigin::Param);
        assert_eq!(scope.get("x").unwrap().var_type, VarType::Int);
    }

    #[test]
    fn test_mark_used() {
        let mut scope = Scope::new();
        scope.declare("x", VarOrigin::Local, VarType::Int).unwrap();
        assert!(!scope.get("x").unwrap().used);
        assert!(scope.mark_used("x").is_some());
        assert!(scope.get("x").unwrap().used);
        assert!(scope.mark_used("y").is_none());
    }

    #[test]
    fn test_child_layer_sees_parent_and_hides_it() {
        let mut outer = Scope::new();
        outer.declare("n", VarOrigin::Param, VarType::Int).unwrap();
        outer.declare("i", VarOrigin::Local, VarType::Int).unwrap();

        let mut inner = Scope::with_parent(&outer);
        inner.bind("i", VarOrigin::Bound, VarType::IntArray);

        assert_eq!(inner.get("n").unwrap().origin, VarOrigin::Param);
        assert_eq!(inner.get("i").unwrap().origin, VarOrigin::Bound);
        assert_eq!(inner.len(), 1);
        drop(inner);
        assert_eq!(outer.get("i").unwrap().origin, VarOrigin::Local);
    }

    #[test]
    fn test_var_type_json_names() {
        let json = serde_json::to_string(&[VarType::Int, VarType::IntArray]).unwrap();
        assert_eq!(json, r#"["int","int[]"]"#);
    }
}
