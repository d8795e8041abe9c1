use modelsync_core::db::open_db_in_memory;
use modelsync_core::{
    CredentialProvider, ImportError, ImportService, RemoteCatalog, RemoteProjectEntry,
    SqliteMergeRepository, UpstreamError,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

struct StaticCredentials {
    token: Option<String>,
}

impl CredentialProvider for StaticCredentials {
    fn bearer_token(&self) -> Result<String, UpstreamError> {
        self.token
            .clone()
            .ok_or_else(|| UpstreamError::new("token_rejected", "client secret revoked", false))
    }
}

struct StaticCatalog {
    entries: Vec<RemoteProjectEntry>,
    seen_token: Mutex<Option<String>>,
}

impl RemoteCatalog for StaticCatalog {
    fn list_projects(&self, bearer_token: &str) -> Result<Vec<RemoteProjectEntry>, UpstreamError> {
        *self.seen_token.lock().unwrap() = Some(bearer_token.to_string());
        Ok(self.entries.clone())
    }
}

fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

#[test]
fn import_creates_missing_projects_and_counts_existing() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO projects (project_uuid, name) VALUES (?1, 'Tower A');",
        [uuid::Uuid::new_v4().to_string()],
    )
    .unwrap();

    let catalog = Arc::new(StaticCatalog {
        entries: vec![
            RemoteProjectEntry {
                name: "Tower A".to_string(),
                description: Some("existing".to_string()),
                external_ref: Some("rp-1".to_string()),
            },
            RemoteProjectEntry {
                name: "Plant B".to_string(),
                description: Some("new plant".to_string()),
                external_ref: Some("rp-2".to_string()),
            },
        ],
        seen_token: Mutex::new(None),
    });
    let service = ImportService::new(
        SqliteMergeRepository::new(&conn),
        Arc::new(StaticCredentials {
            token: Some("bearer-123".to_string()),
        }),
        catalog.clone(),
    );

    let summary = service.run_once().unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(summary.existing, 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM projects;"), 2);

    // The catalog was called with the issued credential.
    assert_eq!(
        catalog.seen_token.lock().unwrap().as_deref(),
        Some("bearer-123")
    );

    let (source_tag, external_ref): (Option<String>, Option<String>) = conn
        .query_row(
            "SELECT source_tag, external_project_id FROM projects WHERE name = 'Plant B';",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(source_tag.as_deref(), Some("remote"));
    assert_eq!(external_ref.as_deref(), Some("rp-2"));

    // The pre-existing project is left untouched.
    let existing_tag: Option<String> = conn
        .query_row(
            "SELECT source_tag FROM projects WHERE name = 'Tower A';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(existing_tag, None);
}

#[test]
fn repeated_import_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let catalog = Arc::new(StaticCatalog {
        entries: vec![RemoteProjectEntry {
            name: "Plant B".to_string(),
            description: None,
            external_ref: None,
        }],
        seen_token: Mutex::new(None),
    });
    let service = ImportService::new(
        SqliteMergeRepository::new(&conn),
        Arc::new(StaticCredentials {
            token: Some("bearer-123".to_string()),
        }),
        catalog,
    );

    let first = service.run_once().unwrap();
    let second = service.run_once().unwrap();

    assert_eq!(first.created, 1);
    assert_eq!(second.created, 0);
    assert_eq!(second.existing, 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM projects;"), 1);
}

#[test]
fn credential_failure_propagates_with_cause_and_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = ImportService::new(
        SqliteMergeRepository::new(&conn),
        Arc::new(StaticCredentials { token: None }),
        Arc::new(StaticCatalog {
            entries: vec![RemoteProjectEntry {
                name: "Plant B".to_string(),
                description: None,
                external_ref: None,
            }],
            seen_token: Mutex::new(None),
        }),
    );

    let err = service.run_once().unwrap_err();
    match err {
        ImportError::Credential(cause) => {
            assert_eq!(cause.code, "token_rejected");
            assert!(!cause.retryable);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM projects;"), 0);
}
