use modelsync_core::db::open_db_in_memory;
use modelsync_core::{
    CategorySnapshot, ElementSnapshot, FamilySnapshot, FamilyTypeSnapshot, ObserverRegistry,
    OwnerDescriptor, ProjectLocks, ProjectSnapshot, PushError, PushService,
    SqliteMergeRepository,
};
use rusqlite::Connection;
use std::sync::Arc;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn push_service(conn: &Connection) -> PushService<SqliteMergeRepository<'_>> {
    PushService::new(
        SqliteMergeRepository::new(conn),
        Arc::new(ProjectLocks::new()),
        Arc::new(ObserverRegistry::new()),
    )
}

fn tower_snapshot(hours: f64) -> ProjectSnapshot {
    ProjectSnapshot {
        name: "Tower A".to_string(),
        hours,
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
    }
}

fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

#[test]
fn summary_reports_project_owner_and_category_count() {
    let conn = setup();
    let service = push_service(&conn);

    let summary = service.apply_push(&tower_snapshot(10.0)).unwrap();
    assert_eq!(summary.project_name, "Tower A");
    assert_eq!(summary.owner_name, "Ana");
    assert_eq!(summary.categories_synced, 1);
    assert!(summary.completed_at_ms > 0);

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM projects;"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM categories;"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM families;"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM family_types;"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM elements;"), 1);
}

#[test]
fn repeated_push_reproduces_same_tree_with_fresh_rows() {
    let conn = setup();
    let service = push_service(&conn);

    service.apply_push(&tower_snapshot(10.0)).unwrap();
    let first_category_uuid: String = conn
        .query_row("SELECT category_uuid FROM categories;", [], |row| {
            row.get(0)
        })
        .unwrap();

    service.apply_push(&tower_snapshot(10.0)).unwrap();
    let second_category_uuid: String = conn
        .query_row("SELECT category_uuid FROM categories;", [], |row| {
            row.get(0)
        })
        .unwrap();

    // Same shape, same names, same counts; internal ids are fresh because
    // the category subtree is wholesale replaced.
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM categories;"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM elements;"), 1);
    let element_name: String = conn
        .query_row("SELECT name FROM elements;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(element_name, "W-001");
    assert_ne!(first_category_uuid, second_category_uuid);
}

#[test]
fn participation_accumulates_while_project_hours_take_last_write() {
    let conn = setup();
    let service = push_service(&conn);

    service.apply_push(&tower_snapshot(5.0)).unwrap();
    service.apply_push(&tower_snapshot(3.0)).unwrap();

    let participation_hours: f64 = conn
        .query_row("SELECT hours FROM participations;", [], |row| row.get(0))
        .unwrap();
    let project_hours: f64 = conn
        .query_row("SELECT hours_logged FROM projects;", [], |row| row.get(0))
        .unwrap();

    assert_eq!(participation_hours, 8.0);
    assert_eq!(project_hours, 3.0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM participations;"), 1);
}

#[test]
fn owner_contact_address_resolves_to_single_row_and_keeps_name() {
    let conn = setup();
    let service = push_service(&conn);

    service.apply_push(&tower_snapshot(1.0)).unwrap();

    let mut renamed = tower_snapshot(2.0);
    renamed.owner.name = "Ana Maria".to_string();
    let summary = service.apply_push(&renamed).unwrap();

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM owners;"), 1);
    let stored_name: String = conn
        .query_row("SELECT name FROM owners;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored_name, "Ana");
    // The summary reflects the stored owner, not the push's spelling.
    assert_eq!(summary.owner_name, "Ana");
}

#[test]
fn second_owner_does_not_reparent_project() {
    let conn = setup();
    let service = push_service(&conn);

    service.apply_push(&tower_snapshot(4.0)).unwrap();

    let mut from_bruno = tower_snapshot(6.0);
    from_bruno.owner = OwnerDescriptor {
        name: "Bruno".to_string(),
        contact_address: "bruno@x.com".to_string(),
    };
    service.apply_push(&from_bruno).unwrap();

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM owners;"), 2);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM participations;"), 2);

    let project_owner: String = conn
        .query_row(
            "SELECT o.name
             FROM projects p
             JOIN owners o ON o.owner_uuid = p.owner_uuid;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(project_owner, "Ana");
}

#[test]
fn duplicate_names_in_one_push_create_duplicate_rows() {
    let conn = setup();
    let service = push_service(&conn);

    let mut snapshot = tower_snapshot(1.0);
    snapshot.categories.push(snapshot.categories[0].clone());
    let summary = service.apply_push(&snapshot).unwrap();

    assert_eq!(summary.categories_synced, 2);
    assert_eq!(
        count(&conn, "SELECT COUNT(*) FROM categories WHERE name = 'Walls';"),
        2
    );
}

#[test]
fn invalid_snapshot_is_rejected_before_any_mutation() {
    let conn = setup();
    let service = push_service(&conn);

    let mut snapshot = tower_snapshot(1.0);
    snapshot.hours = -3.0;
    let err = service.apply_push(&snapshot).unwrap_err();
    assert!(matches!(err, PushError::Validation(_)));

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM owners;"), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM projects;"), 0);
}

#[test]
fn category_replace_keeps_other_projects_untouched() {
    let conn = setup();
    let service = push_service(&conn);

    service.apply_push(&tower_snapshot(1.0)).unwrap();

    let mut other = tower_snapshot(2.0);
    other.name = "Plant B".to_string();
    other.categories[0].name = "Pipes".to_string();
    service.apply_push(&other).unwrap();

    // Re-pushing Tower A replaces only Tower A's subtree.
    service.apply_push(&tower_snapshot(3.0)).unwrap();

    assert_eq!(
        count(&conn, "SELECT COUNT(*) FROM categories WHERE name = 'Pipes';"),
        1
    );
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM categories;"), 2);
}
