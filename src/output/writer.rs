// src/output/writer.rs
//! Executes output operations by performing actual I/O.
//!
//! This module is the only place where snapshot files are written.

use super::types::*;
use crate::error::AppError;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Delivers the output plan, performing all I/O operations.
///
/// Every operation is attempted; failures are collected in the report
/// rather than aborting the plan.
pub fn deliver(plan: OutputPlan) -> OutputReport {
    let mut report = OutputReport::new();
    let start_time = Instant::now();

    log::debug!(
        "Executing output plan with {} operations",
        plan.operations.len()
    );

    for operation in plan.operations {
        let op_start = Instant::now();
        match execute_operation(&operation) {
            Ok(bytes_written) => {
                let duration_ms = op_start.elapsed().as_millis() as u64;
                report = report.with_completed(CompletedOperation {
                    operation,
                    bytes_written,
                    duration_ms,
                });
            }
            Err(e) => {
                log::error!("Operation on {} failed: {}", operation.path().display(), e);
                report = report.with_failed(FailedOperation {
                    operation,
                    error: e.to_string(),
                });
            }
        }
    }

    report.stats.total_duration_ms = start_time.elapsed().as_millis() as u64;

    log::info!(
        "Output plan complete: {} succeeded, {} failed, {} bytes in {}ms",
        report.stats.operations_completed,
        report.stats.operations_failed,
        report.stats.bytes_written,
        report.stats.total_duration_ms
    );

    report
}

/// Renders `data` as two-space indented JSON with a trailing newline.
///
/// Non-ASCII text is written as-is, not escaped.
pub fn to_json_document<T: Serialize + ?Sized>(data: &T) -> Result<String, AppError> {
    let mut text = serde_json::to_string_pretty(data)?;
    text.push('\n');
    Ok(text)
}

/// Writes `data` as a JSON document, creating parent directories.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<usize, AppError> {
    let text = to_json_document(data)?;
    write_file(path, &text)
}

fn execute_operation(operation: &DeliveryTarget) -> Result<usize, AppError> {
    match operation {
        DeliveryTarget::WriteJson { path, value } => save_json(path, value),
        DeliveryTarget::WriteFile { path, content } => write_file(path, content),
        DeliveryTarget::CreateDirectory { path } => {
            create_directory(path)?;
            Ok(0)
        }
    }
}

fn write_file(path: &Path, content: &str) -> Result<usize, AppError> {
    log::debug!("Writing {} bytes to {}", content.len(), path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;

    Ok(content.len())
}

fn create_directory(path: &Path) -> Result<(), AppError> {
    if path.exists() {
        if path.is_dir() {
            return Ok(());
        }
        return Err(AppError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("Path exists but is not a directory: {}", path.display()),
        )));
    }

    fs::create_dir_all(path)?;
    log::debug!("Created directory: {}", path.display());
    Ok(())
}
