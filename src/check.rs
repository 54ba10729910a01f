use crate::cli::OutputFormat;
use color_eyre::{eyre::Context, Result};
use hl7_check::{field_info, is_valid, validate, SchemaRegistry, ValidationError};
use serde::Serialize;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::instrument;

#[derive(Debug, Serialize)]
struct FileReport<'a> {
    file: &'a Path,
    valid: bool,
    diagnostics: &'a [ValidationError],
}

fn write_text<W: Write>(out: &mut W, file: &Path, errors: &[ValidationError]) -> Result<()> {
    for error in errors {
        writeln!(
            out,
            "{}:{}:{}: {}: {}",
            file.display(),
            error.line,
            error.field,
            error.severity,
            error.message
        )?;
    }
    Ok(())
}

/// Validate each file and write its diagnostics to `out`.
///
/// Returns `true` when no file had an error.
#[instrument(level = "debug", skip(out, registry))]
pub fn check_files<W: Write>(
    out: &mut W,
    files: &[PathBuf],
    format: OutputFormat,
    registry: &SchemaRegistry,
) -> Result<bool> {
    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        let text = fs::read_to_string(file)
            .wrap_err_with(|| format!("Failed to read message file: {file:?}"))?;
        let errors = validate(&text, registry);
        tracing::debug!(?file, count = errors.len(), "validated file");
        reports.push((file, errors));
    }

    match format {
        OutputFormat::Text => {
            for (file, errors) in reports.iter() {
                write_text(out, file, errors)?;
            }
        }
        OutputFormat::Json => {
            let reports: Vec<FileReport> = reports
                .iter()
                .map(|(file, errors)| FileReport {
                    file,
                    valid: is_valid(errors),
                    diagnostics: errors,
                })
                .collect();
            serde_json::to_writer_pretty(&mut *out, &reports)
                .wrap_err("Failed to write diagnostics")?;
            writeln!(out)?;
        }
    }

    Ok(reports.iter().all(|(_, errors)| is_valid(errors)))
}

/// Write the resolved field as JSON. Returns `false` when it doesn't resolve.
#[instrument(level = "debug", skip(out, registry))]
pub fn inspect_field<W: Write>(
    out: &mut W,
    file: &Path,
    line: usize,
    field: usize,
    registry: &SchemaRegistry,
) -> Result<bool> {
    let text = fs::read_to_string(file)
        .wrap_err_with(|| format!("Failed to read message file: {file:?}"))?;

    match field_info::inspect(&text, line, field, registry) {
        Some(info) => {
            serde_json::to_writer_pretty(&mut *out, &info).wrap_err("Failed to write field")?;
            writeln!(out)?;
            Ok(true)
        }
        None => {
            writeln!(out, "{}: field {field} of line {line} not found", file.display())?;
            Ok(false)
        }
    }
}
