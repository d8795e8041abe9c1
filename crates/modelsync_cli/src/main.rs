//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `modelsync_core` linkage.
//! - Exercise the push/export wire shapes end-to-end against a database
//!   file for quick local sanity checks.

use modelsync_core::db::open_db;
use modelsync_core::{
    ExportService, ObserverRegistry, ProjectLocks, ProjectSnapshot, PushService,
    SqliteExportRepository, SqliteMergeRepository,
};
use std::sync::Arc;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(message) = run(&args) {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<(), String> {
    match args.first().map(String::as_str) {
        None => {
            println!("modelsync_core ping={}", modelsync_core::ping());
            println!("modelsync_core version={}", modelsync_core::core_version());
            Ok(())
        }
        Some("push") => {
            let db_path = required_arg(args, 1, "push <db-path> <payload.json>")?;
            let payload_path = required_arg(args, 2, "push <db-path> <payload.json>")?;
            apply_push(db_path, payload_path)
        }
        Some("export") => {
            let db_path = required_arg(args, 1, "export <db-path> [project-name]")?;
            export_tree(db_path, args.get(2).map(String::as_str))
        }
        Some(other) => Err(format!("unknown command `{other}`; expected push|export")),
    }
}

fn required_arg<'a>(args: &'a [String], index: usize, usage: &str) -> Result<&'a str, String> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| format!("usage: {usage}"))
}

fn apply_push(db_path: &str, payload_path: &str) -> Result<(), String> {
    let payload = std::fs::read_to_string(payload_path)
        .map_err(|err| format!("cannot read `{payload_path}`: {err}"))?;
    let snapshot: ProjectSnapshot =
        serde_json::from_str(&payload).map_err(|err| format!("malformed push payload: {err}"))?;

    let conn = open_db(db_path).map_err(|err| format!("cannot open `{db_path}`: {err}"))?;
    let service = PushService::new(
        SqliteMergeRepository::new(&conn),
        Arc::new(ProjectLocks::new()),
        Arc::new(ObserverRegistry::new()),
    );

    let summary = service
        .apply_push(&snapshot)
        .map_err(|err| err.to_string())?;
    let rendered = serde_json::to_string_pretty(&summary)
        .map_err(|err| format!("cannot render summary: {err}"))?;
    println!("{rendered}");
    Ok(())
}

fn export_tree(db_path: &str, project_name: Option<&str>) -> Result<(), String> {
    let conn = open_db(db_path).map_err(|err| format!("cannot open `{db_path}`: {err}"))?;
    let service = ExportService::new(SqliteExportRepository::new(&conn));

    let rendered = match project_name {
        Some(name) => {
            let project = service
                .export_project(name)
                .map_err(|err| err.to_string())?
                .ok_or_else(|| format!("project `{name}` not found"))?;
            serde_json::to_string_pretty(&project)
        }
        None => {
            let projects = service.export_all().map_err(|err| err.to_string())?;
            serde_json::to_string_pretty(&projects)
        }
    }
    .map_err(|err| format!("cannot render export: {err}"))?;

    println!("{rendered}");
    Ok(())
}
