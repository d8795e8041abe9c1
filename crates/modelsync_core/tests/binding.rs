use modelsync_core::db::open_db_in_memory;
use modelsync_core::{
    BindingService, CategorySnapshot, ElementSnapshot, EntityKind, ExternalIdBinding,
    FamilySnapshot, FamilyTypeSnapshot, ObserverRegistry, OwnerDescriptor, ProjectLocks,
    ProjectSnapshot, PushService, SqliteBindingRepository, SqliteMergeRepository,
};
use rusqlite::Connection;
use std::sync::Arc;
use uuid::Uuid;

fn setup_with_tree() -> Connection {
    let conn = open_db_in_memory().unwrap();
    let service = PushService::new(
        SqliteMergeRepository::new(&conn),
        Arc::new(ProjectLocks::new()),
        Arc::new(ObserverRegistry::new()),
    );
    service
        .apply_push(&ProjectSnapshot {
            name: "Tower A".to_string(),
            hours: 10.0,
            owner: OwnerDescriptor {
                name: "Ana".to_string(),
                contact_address: "ana@x.com".to_string(),
            },
            categories: vec![CategorySnapshot {
                name: "Walls".to_string(),
                classification_code: Some("0310".to_string()),
                families: vec![FamilySnapshot {
                    name: "Wall-Basic".to_string(),
                    classification_code: None,
                    parameters: Some("{}".to_string()),
                    family_types: vec![FamilyTypeSnapshot {
                        name: "Generic 200mm".to_string(),
                        classification_code: None,
                        parameters: Some("{}".to_string()),
                        elements: vec![ElementSnapshot {
                            name: "W-001".to_string(),
                            classification_code: None,
                            parameters: None,
                        }],
                    }],
                }],
            }],
        })
        .unwrap();
    conn
}

fn row_uuid(conn: &Connection, table: &str, pk_column: &str) -> Uuid {
    let text: String = conn
        .query_row(&format!("SELECT {pk_column} FROM {table};"), [], |row| {
            row.get(0)
        })
        .unwrap();
    Uuid::parse_str(&text).unwrap()
}

fn stored_external_id(conn: &Connection, table: &str) -> Option<i64> {
    conn.query_row(&format!("SELECT external_id FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn binding_stamps_external_ids_for_each_kind() {
    let conn = setup_with_tree();
    let service = BindingService::new(SqliteBindingRepository::new(&conn));

    let batch = vec![
        ExternalIdBinding {
            kind: EntityKind::Family,
            internal_id: row_uuid(&conn, "families", "family_uuid"),
            external_id: 100,
        },
        ExternalIdBinding {
            kind: EntityKind::FamilyType,
            internal_id: row_uuid(&conn, "family_types", "type_uuid"),
            external_id: 200,
        },
        ExternalIdBinding {
            kind: EntityKind::Element,
            internal_id: row_uuid(&conn, "elements", "element_uuid"),
            external_id: 555,
        },
    ];
    let report = service.bind(&batch).unwrap();

    assert_eq!(report.applied, 3);
    assert_eq!(report.skipped, 0);
    assert_eq!(stored_external_id(&conn, "families"), Some(100));
    assert_eq!(stored_external_id(&conn, "family_types"), Some(200));
    assert_eq!(stored_external_id(&conn, "elements"), Some(555));
}

#[test]
fn binding_same_pair_twice_leaves_row_unchanged() {
    let conn = setup_with_tree();
    let service = BindingService::new(SqliteBindingRepository::new(&conn));
    let binding = ExternalIdBinding {
        kind: EntityKind::Element,
        internal_id: row_uuid(&conn, "elements", "element_uuid"),
        external_id: 555,
    };

    service.bind(std::slice::from_ref(&binding)).unwrap();
    let report = service.bind(std::slice::from_ref(&binding)).unwrap();

    assert_eq!(report.applied, 1);
    assert_eq!(stored_external_id(&conn, "elements"), Some(555));
}

#[test]
fn rebinding_different_value_overwrites() {
    let conn = setup_with_tree();
    let service = BindingService::new(SqliteBindingRepository::new(&conn));
    let internal_id = row_uuid(&conn, "elements", "element_uuid");

    service
        .bind(&[ExternalIdBinding {
            kind: EntityKind::Element,
            internal_id,
            external_id: 555,
        }])
        .unwrap();
    service
        .bind(&[ExternalIdBinding {
            kind: EntityKind::Element,
            internal_id,
            external_id: 556,
        }])
        .unwrap();

    assert_eq!(stored_external_id(&conn, "elements"), Some(556));
}

#[test]
fn binding_vanished_row_is_skipped_without_error() {
    let conn = setup_with_tree();
    let service = BindingService::new(SqliteBindingRepository::new(&conn));

    let report = service
        .bind(&[ExternalIdBinding {
            kind: EntityKind::Family,
            internal_id: Uuid::new_v4(),
            external_id: 100,
        }])
        .unwrap();

    assert_eq!(report.applied, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(stored_external_id(&conn, "families"), None);
}

#[test]
fn empty_batch_is_a_noop() {
    let conn = setup_with_tree();
    let service = BindingService::new(SqliteBindingRepository::new(&conn));

    let report = service.bind(&[]).unwrap();
    assert_eq!(report.applied, 0);
    assert_eq!(report.skipped, 0);
}
