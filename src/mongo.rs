use crate::env::{
    env_or, LOG_SINK_MONGO_AUTH_DB_ENV, LOG_SINK_MONGO_COLLECTION_ENV, LOG_SINK_MONGO_DB_ENV,
    LOG_SINK_MONGO_PASSWORD_ENV, LOG_SINK_MONGO_URI_ENV, LOG_SINK_MONGO_USER_ENV,
};
use crate::formatter::Document;
use crate::store::{DocumentStore, StoreError};
use async_trait::async_trait;
use mongodb::bson::{self, doc};
use mongodb::options::{ClientOptions, Credential};
use mongodb::{Client, Collection};

/// Configuration for [`MongoStore`].
#[derive(Clone, Debug)]
pub struct MongoConfig {
    /// Connection URI, e.g. `mongodb://127.0.0.1:27017`.
    pub uri: String,
    pub database: String,
    pub collection: String,
    /// Credentials; authentication is skipped unless both are set.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Database to authenticate against.
    pub auth_database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "logs".to_string(),
            collection: "logs".to_string(),
            username: None,
            password: None,
            auth_database: "admin".to_string(),
        }
    }
}

impl MongoConfig {
    /// Build a config from the `LOG_SINK_MONGO_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = MongoConfig::default();
        MongoConfig {
            uri: env_or(LOG_SINK_MONGO_URI_ENV, &defaults.uri),
            database: env_or(LOG_SINK_MONGO_DB_ENV, &defaults.database),
            collection: env_or(LOG_SINK_MONGO_COLLECTION_ENV, &defaults.collection),
            username: std::env::var(LOG_SINK_MONGO_USER_ENV).ok(),
            password: std::env::var(LOG_SINK_MONGO_PASSWORD_ENV).ok(),
            auth_database: env_or(LOG_SINK_MONGO_AUTH_DB_ENV, &defaults.auth_database),
        }
    }
}

/// MongoDB implementation of [`DocumentStore`] using the official driver.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    collection: Collection<bson::Document>,
}

impl MongoStore {
    /// Connect to the deployment described by `config` and validate it
    /// with a `ping` round-trip.
    ///
    /// **Returns**
    /// - `Ok(store)` bound to the configured collection.
    /// - `Err(StoreError::Connectivity)` when the URI is malformed, the
    ///   server is unreachable, or authentication fails. This is the
    ///   construction-time error the fail-silently policy gates.
    pub async fn connect(config: &MongoConfig) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| StoreError::Connectivity(e.to_string()))?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.credential = Some(
                Credential::builder()
                    .username(username.clone())
                    .password(password.clone())
                    .source(config.auth_database.clone())
                    .build(),
            );
        }

        let client = Client::with_options(options)
            .map_err(|e| StoreError::Connectivity(e.to_string()))?;

        // The client connects lazily; round-trip now so a dead deployment
        // surfaces here rather than on the first write.
        client
            .database(&config.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connectivity(e.to_string()))?;

        let collection = client
            .database(&config.database)
            .collection::<bson::Document>(&config.collection);

        Ok(MongoStore { client, collection })
    }

    fn to_bson(document: &Document) -> Result<bson::Document, StoreError> {
        bson::to_document(document).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_one(&self, document: &Document) -> Result<(), StoreError> {
        let document = Self::to_bson(document)?;
        self.collection
            .insert_one(document)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(())
    }

    async fn insert_many(&self, documents: &[Document]) -> Result<(), StoreError> {
        let documents = documents
            .iter()
            .map(Self::to_bson)
            .collect::<Result<Vec<_>, _>>()?;
        self.collection
            .insert_many(documents)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::DocumentFormatter;
    use crate::record::{Level, LogRecord};

    #[test]
    fn formatted_documents_convert_to_bson() {
        let record = LogRecord::new(Level::Error, "app", "boom")
            .with_extra("attempt", serde_json::json!(3));
        let document = DocumentFormatter.format(&record);
        let converted = MongoStore::to_bson(&document).expect("bson conversion");
        assert_eq!(converted.get_str("level").unwrap(), "ERROR");
        assert_eq!(converted.get_str("message").unwrap(), "boom");
    }
}
