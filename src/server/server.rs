//! HTTP server core implementation
//!
//! This module provides the HttpServer struct and its core methods.

use crate::config::{Config, ServerConfig};
use crate::core::batch::{Dispatcher, DispatcherConfig};
use crate::core::providers::{SmsProvider, TwilioClient, TwilioConfig};
use crate::server::routes;
use crate::server::state::AppState;
use crate::storage::StorageLayer;
use crate::utils::error::{DispatchError, Result};
use crate::utils::limiter::SendPacer;
use actix_cors::Cors;
use actix_web::{App, HttpServer as ActixHttpServer, middleware::DefaultHeaders, web};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

/// HTTP server
pub struct HttpServer {
    /// Server configuration
    config: ServerConfig,
    /// Application state
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server
    ///
    /// Connects storage, runs migrations, builds the provider client and
    /// the dispatcher, and assembles the shared state.
    pub async fn new(config: Config) -> Result<Self> {
        info!("Creating HTTP server");

        let storage = Arc::new(StorageLayer::new(&config.storage).await?);
        storage.migrate().await?;

        config
            .provider
            .validate()
            .map_err(DispatchError::Config)?;

        let mut twilio_config = TwilioConfig::new(
            config.provider.account_sid.clone(),
            config.provider.auth_token.clone(),
            config.provider.from_number.clone(),
        )
        .with_timeout(config.provider.request_timeout);
        if let Some(base_url) = &config.provider.base_url {
            twilio_config = twilio_config.with_base_url(base_url.clone());
        }
        if let Some(callback) = &config.provider.status_callback {
            twilio_config = twilio_config.with_status_callback(callback.clone());
        }

        let provider: Arc<dyn SmsProvider> = Arc::new(TwilioClient::new(twilio_config)?);
        info!("Registered SMS provider: twilio");

        let dispatcher_config = DispatcherConfig::from_settings(&config.dispatch);
        let mut dispatcher =
            Dispatcher::new(provider, Arc::clone(&storage), dispatcher_config);

        if config.provider.messages_per_second > 0 {
            let pacer = Arc::new(SendPacer::new(
                config.provider.messages_per_second,
                config.provider.burst_size(),
            ));
            dispatcher = dispatcher.with_pacer(pacer);
            info!(
                "Outbound sends paced at {}/s",
                config.provider.messages_per_second
            );
        }

        let server_config = config.server.clone();
        let state = AppState::new(config, dispatcher, storage);

        Ok(Self {
            config: server_config,
            state,
        })
    }

    /// Create the Actix-web application
    pub fn create_app(
        state: web::Data<AppState>,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        info!("Setting up routes and middleware");

        let cors_config = &state.config.server.cors;
        let mut cors = Cors::default();

        if cors_config.enabled {
            if cors_config.allows_all_origins() {
                cors = cors.allow_any_origin();
                cors_config.validate().unwrap_or_else(|e| {
                    warn!(error = %e, "CORS configuration warning");
                });
            } else {
                for origin in &cors_config.allowed_origins {
                    cors = cors.allowed_origin(origin);
                }
            }

            let methods: Vec<actix_web::http::Method> = cors_config
                .allowed_methods
                .iter()
                .filter_map(|m| m.parse().ok())
                .collect();
            if !methods.is_empty() {
                cors = cors.allowed_methods(methods);
            }

            let headers: Vec<actix_web::http::header::HeaderName> = cors_config
                .allowed_headers
                .iter()
                .filter_map(|h| h.parse().ok())
                .collect();
            if !headers.is_empty() {
                cors = cors.allowed_headers(headers);
            }

            cors = cors.max_age(cors_config.max_age as usize);

            if cors_config.allow_credentials {
                cors = cors.supports_credentials();
            }
        }

        let json_limit = state.config.server.max_body_size;

        App::new()
            .app_data(state)
            .app_data(web::JsonConfig::default().limit(json_limit))
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(DefaultHeaders::new().add(("Server", "textblast-rs")))
            .configure(routes::health::configure_routes)
            .configure(routes::messages::configure_routes)
            .configure(routes::webhooks::configure_routes)
    }

    /// Start the HTTP server
    pub async fn start(self) -> Result<()> {
        let bind_addr = self.config.address();
        let port = self.config.port;
        let workers = self.config.worker_count();
        let request_timeout = Duration::from_secs(self.config.timeout);

        info!("Starting HTTP server on {}", bind_addr);

        let state = web::Data::new(self.state);

        let server = ActixHttpServer::new(move || Self::create_app(state.clone()))
            .workers(workers)
            .client_request_timeout(request_timeout)
            .bind(&bind_addr)
            .map_err(|e| Self::format_bind_error(e, port))?
            .run();

        info!("HTTP server listening on {}", bind_addr);

        server
            .await
            .map_err(|e| DispatchError::Internal(format!("Server error: {}", e)))?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Turn a bind failure into an actionable startup error
    pub(crate) fn format_bind_error(error: std::io::Error, port: u16) -> DispatchError {
        let error_str = error.to_string();

        if error_str.contains("Address already in use")
            || error_str.contains("os error 48")
            || error_str.contains("os error 98")
        {
            let message = format!(
                r#"
Port {} is already in use.

Possible solutions:
  1. Kill the existing process:  lsof -ti:{} | xargs kill -9
  2. Use a different port:       PORT={}
  3. Check what's using it:      lsof -i:{}
"#,
                port,
                port,
                port + 1,
                port
            );
            DispatchError::Internal(message)
        } else if error_str.contains("Permission denied") || error_str.contains("os error 13") {
            DispatchError::Internal(format!(
                "Permission denied for port {}. Ports below 1024 need elevated privileges; \
                 pick a higher port via PORT.",
                port
            ))
        } else {
            DispatchError::Internal(format!("Failed to bind port {}: {}", port, error))
        }
    }
}
