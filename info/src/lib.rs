//! Build metadata reported by the logger and the health check.

/// The service name reported in logs and health checks.
pub const NAME: &str = "whispr";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The VCS revision, if the build environment provided one.
pub const REVISION: Option<&str> = option_env!("WHISPR_REVISION");

pub const BUILD_TIMESTAMP: Option<&str> = option_env!("BUILD_TIMESTAMP");
