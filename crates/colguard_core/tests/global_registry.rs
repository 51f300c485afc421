//! Process-wide registry behavior. Kept in a single test so no other test in
//! this binary races on the shared instance.

use colguard_core::{
    clear_connections, exists_in, global_registry, register_connection, resolve_connection,
    ConnectionHandle, FieldValue, Record, RuleSet, SqliteConnection, ValidationOptions,
    ValidatorErrorKind,
};
use rusqlite::Connection;
use std::sync::Arc;

fn sqlite_with_user(id: i64) -> Arc<dyn ConnectionHandle> {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY);")
        .unwrap();
    conn.execute("INSERT INTO users (id) VALUES (?1);", [id])
        .unwrap();
    Arc::new(SqliteConnection::from_connection(conn))
}

#[test]
fn global_registry_drives_default_rules_and_resets_cleanly() {
    clear_connections();
    assert!(global_registry().is_empty());

    let first = sqlite_with_user(1);
    register_connection(Arc::clone(&first), None).unwrap();
    assert!(Arc::ptr_eq(&resolve_connection(Some("  ")).unwrap(), &first));

    let mut rules = RuleSet::new();
    exists_in("users", "id", None, ValidationOptions::default()).apply(
        "CreatePost",
        "author_id",
        &mut rules,
    );
    let mut post = Record::new();
    post.insert("author_id".to_string(), FieldValue::from(1));
    assert!(rules.validate("CreatePost", &post).unwrap().is_empty());

    clear_connections();
    let err = rules.validate("CreatePost", &post).unwrap_err();
    assert_eq!(err.kind(), ValidatorErrorKind::NotRegistered);
    assert!(err.to_string().contains("default"));

    let second = sqlite_with_user(2);
    register_connection(Arc::clone(&second), Some("default")).unwrap();
    assert!(Arc::ptr_eq(&resolve_connection(None).unwrap(), &second));
    assert_eq!(rules.validate("CreatePost", &post).unwrap().len(), 1);

    clear_connections();
}
