//! Coordinator service wiring

use std::net::TcpListener;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing::{error, info};

use crate::client::HttpClientFactory;
use crate::config::Config;
use crate::error::CoordError;
use crate::executor::LoggingExecutor;
use crate::handler::Handler;
use crate::manager::Manager;
use crate::registry::HttpClusterRegistry;
use crate::resolver::HostResolver;
use crate::server;

/// Validated configuration plus everything needed to serve it
pub struct Service {
    config: Config,
}

impl Service {
    pub fn new(config: Config) -> eyre::Result<Self> {
        if let Err(e) = config.validate() {
            error!(error = %e, "Invalid configuration");
            return Err(e);
        }
        config.print();
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the request path and wire it to HTTP routes
    pub fn handler(&self) -> Result<Handler, CoordError> {
        let config = &self.config;
        let registry = HttpClusterRegistry::new(&config.registry_address, config.request_timeout())
            .map_err(|e| CoordError::unavailable("cannot create connection with the cluster registry", e))?;

        let executor = LoggingExecutor::new(
            Arc::new(HttpClientFactory),
            config.client_params(),
            config.max_concurrent_hosts,
        );
        let resolver = HostResolver::new(Arc::new(registry), &config.app_cluster_prefix, config.app_cluster_port);
        let manager = Arc::new(Manager::new(resolver, executor, config.limit_per_search));

        Ok(Handler::new(manager.clone(), manager))
    }

    /// Bind the listening socket
    pub fn listen(&self) -> Result<TcpListener, CoordError> {
        TcpListener::bind(("0.0.0.0", self.config.port)).map_err(|e| CoordError::unavailable("failed to listen", e))
    }

    /// Serve until the server is stopped
    pub async fn run(&self) -> Result<(), CoordError> {
        let handler = web::Data::new(self.handler()?);
        let listener = self.listen()?;
        self.serve(listener, handler).await
    }

    pub async fn serve(&self, listener: TcpListener, handler: web::Data<Handler>) -> Result<(), CoordError> {
        let addr = listener
            .local_addr()
            .map_err(|e| CoordError::unavailable("failed to listen", e))?;
        info!(%addr, "Launching HTTP server");

        HttpServer::new(move || App::new().app_data(handler.clone()).configure(server::register))
            .listen(listener)
            .map_err(|e| CoordError::unavailable("failed to listen", e))?
            .run()
            .await
            .map_err(|e| CoordError::unavailable("failed to serve", e))
    }
}
