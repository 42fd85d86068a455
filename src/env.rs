/// Environment variable names used by this crate for convenient
/// configuration of the MongoDB backend from microservices.
///
/// These are purely helpers; the core handler types remain decoupled from
/// environment access.

/// MongoDB connection URI, e.g. `mongodb://127.0.0.1:27017`.
pub const LOG_SINK_MONGO_URI_ENV: &str = "LOG_SINK_MONGO_URI";

/// Target database name.
pub const LOG_SINK_MONGO_DB_ENV: &str = "LOG_SINK_MONGO_DB";

/// Target collection name.
pub const LOG_SINK_MONGO_COLLECTION_ENV: &str = "LOG_SINK_MONGO_COLLECTION";

/// Optional user name.
pub const LOG_SINK_MONGO_USER_ENV: &str = "LOG_SINK_MONGO_USER";

/// Optional password.
pub const LOG_SINK_MONGO_PASSWORD_ENV: &str = "LOG_SINK_MONGO_PASSWORD";

/// Database to authenticate against when credentials are set.
pub const LOG_SINK_MONGO_AUTH_DB_ENV: &str = "LOG_SINK_MONGO_AUTH_DB";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
