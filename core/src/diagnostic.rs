/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Funny Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 *
 * Diagnostic Module
 *
 * User-facing errors of the Funny front end:
 *   - ErrorKind:  closed taxonomy shared by loader, checker and resolver
 *   - SourceSpan: 1-based line/column range of the offending identifier
 *   - FunnyError: message, kind and optional span, serializable to JSON
 *
 * Positions are found by a plain text search for the first occurrence of the
 * identifier, not by token positions. Repeated identifiers therefore always
 * point at their first appearance in the source.
 *
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 * NO IMPLIED LICENSE to rights of Mohamad Al-Zawahreh or Sovereign Systems.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Error Kind
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    SyntaxError,
    DuplicateFunction,
    VariableRedefinition,
    UndeclaredIdentifier,
    AssignToParameter,
    TypeMismatch,
    UndeclaredFunction,
    ArgumentCountMismatch,
    ReturnCountMismatch,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::DuplicateFunction => "DuplicateFunction",
            ErrorKind::VariableRedefinition => "VariableRedefinition",
            ErrorKind::UndeclaredIdentifier => "UndeclaredIdentifier",
            ErrorKind::AssignToParameter => "AssignToParameter",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::UndeclaredFunction => "UndeclaredFunction",
            ErrorKind::ArgumentCountMismatch => "ArgumentCountMismatch",
            ErrorKind::ReturnCountMismatch => "ReturnCountMismatch",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Source Span
// ============================================================================

/// 1-based source range. `end_col` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpan {
    pub start_line: usize,
    pub start_col: usize,
    pub end_col: usize,
    pub end_line: usize,
}

impl SourceSpan {
    /// Position of the first line-local occurrence of `identifier` in
    /// `source`. Columns count characters, not bytes.
    pub fn locate(source: &str, identifier: &str) -> Option<SourceSpan> {
        if identifier.is_empty() {
            return None;
        }
        for (line_idx, line) in source.lines().enumerate() {
            if let Some(byte_idx) = line.find(identifier) {
                let col = line[..byte_idx].chars().count() + 1;
                return Some(SourceSpan {
                    start_line: line_idx + 1,
                    start_col: col,
                    end_col: col + identifier.chars().count(),
                    end_line: line_idx + 1,
                });
            }
        }
        None
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

// ============================================================================
// Funny Error
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnyError {
    pub message: String,
    pub kind: ErrorKind,
    #[serde(flatten)]
    pub span: Option<SourceSpan>,
}

impl FunnyError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        FunnyError {
            message: message.into(),
            kind,
            span: None,
        }
    }

    /// Error positioned at the first occurrence of `identifier` in `source`.
    pub fn at(kind: ErrorKind, message: impl Into<String>, source: &str, identifier: &str) -> Self {
        FunnyError {
            message: message.into(),
            kind,
            span: SourceSpan::locate(source, identifier),
        }
    }

    /// Syntax error reported by the parser at an exact position.
    pub fn syntax(message: impl Into<String>, line: usize, col: usize) -> Self {
        FunnyError {
            message: message.into(),
            kind: ErrorKind::SyntaxError,
            span: Some(SourceSpan {
                start_line: line,
                start_col: col,
                end_col: col,
                end_line: line,
            }),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"message\":{:?}}}", self.message))
    }
}

impl fmt::Display for FunnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some(span) => write!(f, "{} at {}: {}", self.kind, span, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for FunnyError {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_first_occurrence() {
        let source = "main(a: int) returns r: int\n{\n  r = a;\n}";
        let span = SourceSpan::locate(source, "r").unwrap();
        // "returns" on line 1 contains an 'r' before the declaration of `r`.
        assert_eq!(span.start_line, 1);
        assert_eq!(span.start_col, 14);
        assert_eq!(span.end_col, 15);
        assert_eq!(span.end_line, 1);
    }

    #[test]
    fn test_locate_later_line() {
        let source = "f()\n{\n    missing = 1;\n}";
        let span = SourceSpan::locate(source, "missing").unwrap();
        assert_eq!(span.start_line, 3);
        assert_eq!(span.start_col, 5);
        assert_eq!(span.end_col, 12);
    }

    #[test]
    fn test_locate_absent() {
        assert!(SourceSpan::locate("abc", "xyz").is_none());
        assert!(SourceSpan::locate("", "x").is_none());
        assert!(SourceSpan::locate("abc", "").is_none());
    }

    #[test]
    fn test_display_with_and_without_span() {
        let err = FunnyError::at(
            ErrorKind::UndeclaredIdentifier,
            "Undeclared identifier 'y'",
            "x = y;",
            "y",
        );
        insta::assert_snapshot!(err.to_string(), @"UndeclaredIdentifier at 1:5: Undeclared identifier 'y'");

        let err = FunnyError::new(ErrorKind::DuplicateFunction, "Function 'main' is already defined");
        insta::assert_snapshot!(err.to_string(), @"DuplicateFunction: Function 'main' is already defined");
    }

    #[test]
    fn test_json_shape() {
        let err = FunnyError::syntax("Expected ';'", 3, 7);
        let json: serde_json::Value = serde_json::from_str(&err.to_json()).unwrap();
        assert_eq!(json["kind"], "SyntaxError");
        assert_eq!(json["message"], "Expected ';'");
        assert_eq!(json["startLine"], 3);
        assert_eq!(json["startCol"], 7);

        let bare = FunnyError::new(ErrorKind::ReturnCountMismatch, "x");
        let json: serde_json::Value = serde_json::from_str(&bare.to_json()).unwrap();
        assert!(json.get("startLine").is_none());
    }
}
