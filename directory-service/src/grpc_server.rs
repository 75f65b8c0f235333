use std::net::SocketAddr;
use std::sync::Arc;
use tonic::{transport::Server, Request, Response, Status};
use tracing::{error, info};
use url::Url;

use crate::engine::DirectoryEngine;
use crate::error::BrowseResult;
use crate::proto::directory::{
    directory_service_server::{DirectoryService, DirectoryServiceServer},
    BrowseDirectoryRequest, BrowseDirectoryResponse, HealthCheckRequest, HealthCheckResponse,
};
use crate::store::{FileStore, FilesetProvider, MetadataProvider, StorageRegistry};

pub struct GrpcServer<S> {
    engine: Arc<DirectoryEngine<S>>,
    base_url: Url,
}

impl<S> GrpcServer<S>
where
    S: FileStore + StorageRegistry + FilesetProvider + MetadataProvider + 'static,
{
    /// `base_url` is the public listing endpoint navigation references point at.
    pub fn new(engine: Arc<DirectoryEngine<S>>, base_url: Url) -> Self {
        Self { engine, base_url }
    }

    pub async fn start(&self, addr: SocketAddr) -> BrowseResult<()> {
        info!("Starting gRPC server on {}", addr);

        let service = DirectoryServiceImpl {
            engine: self.engine.clone(),
            base_url: self.base_url.clone(),
        };

        Server::builder()
            .add_service(DirectoryServiceServer::new(service))
            .serve(addr)
            .await?;

        Ok(())
    }
}

struct DirectoryServiceImpl<S> {
    engine: Arc<DirectoryEngine<S>>,
    base_url: Url,
}

impl<S> DirectoryServiceImpl<S> {
    fn request_url(&self, query: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(Some(query.trim_start_matches('?')).filter(|q| !q.is_empty()));
        url
    }
}

#[tonic::async_trait]
impl<S> DirectoryService for DirectoryServiceImpl<S>
where
    S: FileStore + StorageRegistry + FilesetProvider + MetadataProvider + 'static,
{
    async fn browse_directory(
        &self,
        request: Request<BrowseDirectoryRequest>,
    ) -> Result<Response<BrowseDirectoryResponse>, Status> {
        let req = request.into_inner();
        info!("gRPC: Received browse_directory request: {}", req.query);

        let url = self.request_url(&req.query);
        let listing = self.engine.browse_url(&url).await.map_err(|e| {
            if !e.is_validation() {
                error!("gRPC: Failed to browse '{}': {}", req.query, e);
            }
            Status::from(e)
        })?;

        let listing_json = listing
            .to_json()
            .map_err(|e| Status::internal(format!("Failed to serialize listing: {}", e)))?;

        info!(
            "gRPC: Returning {} directories and {} files",
            listing.directories.len(),
            listing.files.len()
        );
        Ok(Response::new(BrowseDirectoryResponse {
            listing_json,
            count: listing.count(),
            directory_exists: listing.directory_exists,
        }))
    }

    async fn health_check(
        &self,
        _request: Request<HealthCheckRequest>,
    ) -> Result<Response<HealthCheckResponse>, Status> {
        info!("gRPC: Received health_check request");

        match self.engine.health_check().await {
            Ok(_) => {
                info!("gRPC: Health check passed");
                Ok(Response::new(HealthCheckResponse {
                    status: "healthy".to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                }))
            }
            Err(e) => {
                error!("gRPC: Health check failed: {}", e);
                Err(Status::internal("Health check failed"))
            }
        }
    }
}
