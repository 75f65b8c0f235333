#[cfg(feature = "grpc")]
pub mod proto {
    pub mod directory {
        tonic::include_proto!("directory");
    }
}

pub mod aggregate;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod fields;
pub mod files;
#[cfg(feature = "grpc")]
pub mod grpc_server;
pub mod links;
pub mod memory_store;
pub mod models;
pub mod overlay;
pub mod paginate;
pub mod params;
pub mod path;
pub mod response;
pub mod schema;
pub mod scope;
pub mod store;

pub use cache::AggregateCache;
pub use config::ServiceConfig;
pub use database::PgFileStore;
pub use engine::DirectoryEngine;
pub use error::{BrowseError, BrowseResult};
#[cfg(feature = "grpc")]
pub use grpc_server::GrpcServer;
pub use memory_store::MemoryFileStore;
pub use params::BrowseParams;
pub use path::DirectoryPath;
pub use response::DirectoryListing;
