use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to load {collection} for match `{match_id}`")]
    Load {
        collection: &'static str,
        match_id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to save {collection} for match `{match_id}`")]
    Save {
        collection: &'static str,
        match_id: String,
        #[source]
        source: MongoError,
    },
    #[error("stored {collection} for match `{match_id}` is malformed: {detail}")]
    Decode {
        collection: &'static str,
        match_id: String,
        detail: String,
    },
}
