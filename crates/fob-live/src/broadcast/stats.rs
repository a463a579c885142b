//! Compiler-facing inputs of the broadcaster.

use crate::error::CompilerSignalError;
use crate::protocol::{Diagnostic, SourceLocation, StatusFlags};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Signal from the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerEvent {
    /// A rebuild started
    Invalid,
    /// A build finished
    Done(BuildStats),
}

/// Outcome of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Content hash identifying the build output
    pub hash: String,

    #[serde(default)]
    pub errors: Vec<Diagnostic>,

    #[serde(default)]
    pub warnings: Vec<Diagnostic>,
}

impl BuildStats {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            ..Self::default()
        }
    }

    pub fn with_error(mut self, diagnostic: Diagnostic) -> Self {
        self.errors.push(diagnostic);
        self
    }

    pub fn with_warning(mut self, diagnostic: Diagnostic) -> Self {
        self.warnings.push(diagnostic);
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn flags(&self) -> StatusFlags {
        StatusFlags {
            has_errors: self.has_errors(),
            has_warnings: self.has_warnings(),
        }
    }

    /// Stats without a hash cannot be announced.
    pub fn validate(&self) -> Result<(), CompilerSignalError> {
        if self.hash.trim().is_empty() {
            return Err(CompilerSignalError::MissingHash);
        }
        Ok(())
    }

    /// Interpret compiler stats JSON.
    ///
    /// `errors` and `warnings` may hold plain strings or objects with a
    /// `message` plus optional `file`/`moduleName` and `loc`. Locations are
    /// either `{"line": 3, "column": 7}` or `"3:7"` / `"3:7-12"`.
    pub fn from_json(value: &Value) -> Result<Self, CompilerSignalError> {
        let object = value
            .as_object()
            .ok_or_else(|| CompilerSignalError::Malformed("stats must be a JSON object".to_string()))?;

        let hash = match object.get("hash") {
            None | Some(Value::Null) => return Err(CompilerSignalError::MissingHash),
            Some(Value::String(hash)) => hash.clone(),
            Some(other) => {
                return Err(CompilerSignalError::Malformed(format!(
                    "hash must be a string, got {}",
                    other
                )))
            }
        };

        let stats = Self {
            hash,
            errors: diagnostics(object.get("errors"), "errors")?,
            warnings: diagnostics(object.get("warnings"), "warnings")?,
        };
        stats.validate()?;
        Ok(stats)
    }
}

fn diagnostics(value: Option<&Value>, field: &str) -> Result<Vec<Diagnostic>, CompilerSignalError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(CompilerSignalError::Malformed(format!(
                "{} must be an array",
                field
            )))
        }
    };

    items
        .iter()
        .map(|item| diagnostic(item, field))
        .collect()
}

fn diagnostic(item: &Value, field: &str) -> Result<Diagnostic, CompilerSignalError> {
    match item {
        Value::String(message) => Ok(Diagnostic::new(message.clone())),
        Value::Object(object) => {
            let message = object
                .get("message")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    CompilerSignalError::Malformed(format!("{} entry has no message", field))
                })?;

            let mut diagnostic = Diagnostic::new(message);
            if let Some(file) = object
                .get("file")
                .or_else(|| object.get("moduleName"))
                .and_then(Value::as_str)
            {
                diagnostic = diagnostic.with_file(file);
            }
            diagnostic.loc = object.get("loc").and_then(location);
            Ok(diagnostic)
        }
        other => Err(CompilerSignalError::Malformed(format!(
            "unexpected {} entry: {}",
            field, other
        ))),
    }
}

fn location(value: &Value) -> Option<SourceLocation> {
    match value {
        Value::Object(_) => serde_json::from_value(value.clone()).ok(),
        Value::String(text) => {
            let start = text.split('-').next()?;
            let (line, column) = start.split_once(':')?;
            Some(SourceLocation {
                line: line.trim().parse().ok()?,
                column: column.trim().parse().ok()?,
            })
        }
        _ => None,
    }
}
