//! File commands - upload, list, download and delete

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use uuid::Uuid;
use webdisk_core::{Error, LogEvent};

use super::{get_context, get_logger, log_event};
use crate::output;

pub fn run_upload(path: &Path, json: bool) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;

    let stored = match ctx.files.upload(path) {
        Ok(stored) => stored,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("upload_failed")
                    .with_command("upload")
                    .with_error(error_kind(&e)),
            );
            return Err(e).with_context(|| format!("Failed to upload {}", path.display()));
        }
    };
    ctx.close()?;

    log_event(&logger, LogEvent::new("upload_completed").with_command("upload"));

    if json {
        println!("{}", serde_json::to_string_pretty(&stored)?);
    } else {
        output::success(&format!(
            "Uploaded {} as {} ({})",
            stored.original_name,
            stored.generated_name,
            output::format_size(stored.size_bytes)
        ));
    }

    Ok(())
}

pub fn run_list(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let files = ctx.files.list()?;
    ctx.close()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        println!("No files uploaded yet.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Name", "Original", "Size", "Uploaded", "ID"]);
    for file in &files {
        table.add_row(vec![
            file.generated_name.clone(),
            file.original_name.clone(),
            output::format_size(file.size_bytes),
            file.uploaded_at.format("%Y-%m-%d %H:%M").to_string(),
            file.id.to_string(),
        ]);
    }

    println!("{}", table);
    println!("{}", format!("{} file(s)", files.len()).dimmed());
    Ok(())
}

pub fn run_download(name: &str, output_path: Option<PathBuf>, json: bool) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;
    let dest = output_path.unwrap_or_else(|| PathBuf::from("."));

    let written = match ctx.files.download(name, &dest) {
        Ok(path) => path,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("download_failed")
                    .with_command("download")
                    .with_error(error_kind(&e)),
            );
            return Err(e.into());
        }
    };
    ctx.close()?;

    log_event(&logger, LogEvent::new("download_completed").with_command("download"));

    if json {
        println!("{}", serde_json::json!({"path": written.to_string_lossy()}));
    } else {
        output::success(&format!("Saved to {}", written.display()));
    }

    Ok(())
}

pub fn run_delete(id: Uuid, json: bool) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;
    let deleted = ctx.files.delete(id)?;
    ctx.close()?;

    if deleted {
        log_event(&logger, LogEvent::new("delete_completed").with_command("delete"));
    }

    if json {
        println!("{}", serde_json::json!({"deleted": deleted, "id": id}));
    } else if deleted {
        output::success(&format!("Deleted {}", id));
    } else {
        output::warning(&format!("No file with id {}", id));
    }

    Ok(())
}

/// Error category for the log; paths and file names stay out of it
fn error_kind(e: &Error) -> &'static str {
    match e {
        Error::NotFound(_) => "not found",
        Error::Validation(_) => "validation",
        Error::Storage(_) => "storage",
        Error::Io(_) => "io",
        Error::Database(_) => "database",
        _ => "other",
    }
}
