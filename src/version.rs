// Package identity baked in at build time; shown by `--version` and GET /version.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");
