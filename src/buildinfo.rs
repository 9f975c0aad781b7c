//! Version and build metadata.
//!
//! `KUBECTL_MIGRATE_COMMIT` and `KUBECTL_MIGRATE_BUILD_DATE` are read from the
//! build environment.

pub const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

pub fn commit() -> &'static str {
    option_env!("KUBECTL_MIGRATE_COMMIT").unwrap_or("unknown")
}

pub fn build_date() -> &'static str {
    option_env!("KUBECTL_MIGRATE_BUILD_DATE").unwrap_or("unknown")
}
