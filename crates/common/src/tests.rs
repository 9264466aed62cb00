use super::*;
use std::io;

#[test]
fn config_defaults_are_sane() {
    let cfg = Config::default();
    assert_eq!(cfg.page_size, 4096);
    assert_eq!(cfg.buffer_pool_pages, 100);
}

#[test]
fn config_builder_overrides_defaults() {
    let cfg = Config::builder().buffer_pool_pages(3).build();
    assert_eq!(cfg.buffer_pool_pages, 3);
    assert_eq!(cfg.page_size, 4096);
}

#[test]
fn db_error_formats_cleanly() {
    let err = DbError::Storage("corruption".into());
    assert!(format!("{err}").contains("storage"));
}

#[test]
fn catalog_error_formats_cleanly() {
    let err = DbError::Catalog("unknown table 'x'".into());
    assert!(format!("{err}").contains("catalog"));
}

#[test]
fn io_error_converts() {
    let e = io::Error::other("oops");
    let db_err: DbError = e.into();
    assert!(matches!(db_err, DbError::Io(_)));
}

#[test]
fn rid_equality_is_structural() {
    assert_eq!(Rid::new(1, 2), Rid::new(1, 2));
    assert_ne!(Rid::new(1, 2), Rid::new(1, 3));
}

#[test]
fn row_wraps_values() {
    let row = Row::new(vec![Value::Int(1), Value::Bool(true)]);
    assert_eq!(row.values().len(), 2);
}
