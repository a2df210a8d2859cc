//! Unit tests for the application error taxonomy.

use questlog::AppError;

#[test]
fn display_includes_variant_prefix() {
    assert_eq!(
        AppError::Config("bad value".into()).to_string(),
        "config: bad value"
    );
    assert_eq!(AppError::Db("locked".into()).to_string(), "db: locked");
    assert_eq!(
        AppError::NotFound("task t-1".into()).to_string(),
        "not found: task t-1"
    );
    assert_eq!(
        AppError::AlreadyDecided("draft d-1".into()).to_string(),
        "already decided: draft d-1"
    );
    assert_eq!(
        AppError::Unauthorized("token expired".into()).to_string(),
        "unauthorized: token expired"
    );
}

#[test]
fn sqlx_errors_map_to_db() {
    let err: AppError = sqlx::Error::RowNotFound.into();
    assert!(matches!(err, AppError::Db(_)));
}

#[test]
fn io_errors_map_to_io() {
    let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(err, AppError::Io(msg) if msg.contains("gone")));
}

#[test]
fn error_trait_is_implemented() {
    let err = AppError::Http("boom".into());
    let dyn_err: &dyn std::error::Error = &err;
    assert_eq!(dyn_err.to_string(), "http: boom");
}
