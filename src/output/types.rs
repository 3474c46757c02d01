// src/output/types.rs
//! Type definitions for output operations.
//!
//! Jobs build an [`OutputPlan`] from their snapshot data and hand it to
//! [`super::deliver`]; nothing else in the crate touches the filesystem
//! for snapshot output.

use crate::error::AppError;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Represents a complete output plan.
#[derive(Debug, Clone, Default)]
pub struct OutputPlan {
    /// List of operations to perform, in order
    pub operations: Vec<DeliveryTarget>,
}

impl OutputPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: DeliveryTarget) -> Self {
        self.operations.push(operation);
        self
    }

    /// Adds a JSON document, serializing `data` now.
    pub fn with_json<T: Serialize>(self, path: impl Into<PathBuf>, data: &T) -> Result<Self, AppError> {
        let value = serde_json::to_value(data)?;
        Ok(self.with_operation(DeliveryTarget::WriteJson {
            path: path.into(),
            value,
        }))
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.with_operation(DeliveryTarget::WriteFile {
            path: path.into(),
            content: content.into(),
        })
    }

    pub fn with_directory(self, path: impl Into<PathBuf>) -> Self {
        self.with_operation(DeliveryTarget::CreateDirectory { path: path.into() })
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Represents a single output operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryTarget {
    /// Pretty-printed JSON with a trailing newline
    WriteJson { path: PathBuf, value: Value },
    /// Write text content verbatim
    WriteFile { path: PathBuf, content: String },
    /// Create a directory and its parents
    CreateDirectory { path: PathBuf },
}

impl DeliveryTarget {
    pub fn path(&self) -> &std::path::Path {
        match self {
            DeliveryTarget::WriteJson { path, .. }
            | DeliveryTarget::WriteFile { path, .. }
            | DeliveryTarget::CreateDirectory { path } => path,
        }
    }
}

/// Result of executing an output plan.
#[derive(Debug, Clone, Default)]
pub struct OutputReport {
    /// Successfully completed operations
    pub completed: Vec<CompletedOperation>,
    /// Failed operations with errors
    pub failed: Vec<FailedOperation>,
    /// Execution statistics
    pub stats: ExecutionStats,
}

impl OutputReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_completed(mut self, operation: CompletedOperation) -> Self {
        self.stats.operations_completed += 1;
        self.stats.bytes_written += operation.bytes_written;
        self.completed.push(operation);
        self
    }

    pub fn with_failed(mut self, operation: FailedOperation) -> Self {
        self.stats.operations_failed += 1;
        self.failed.push(operation);
        self
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Converts a report with failures into [`AppError::DeliveryFailed`].
    pub fn into_result(self) -> Result<Self, AppError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(AppError::DeliveryFailed {
                failures: self
                    .failed
                    .iter()
                    .map(|f| format!("{}: {}", f.operation.path().display(), f.error))
                    .collect(),
            })
        }
    }
}

/// A successfully completed operation.
#[derive(Debug, Clone)]
pub struct CompletedOperation {
    pub operation: DeliveryTarget,
    pub bytes_written: usize,
    pub duration_ms: u64,
}

/// A failed operation with error information.
#[derive(Debug, Clone)]
pub struct FailedOperation {
    pub operation: DeliveryTarget,
    pub error: String,
}

/// Execution statistics.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStats {
    pub operations_completed: usize,
    pub operations_failed: usize,
    pub bytes_written: usize,
    pub total_duration_ms: u64,
}
