//! HTTP Body Buffering Filter for Envoy Proxy
//!
//! This filter captures request and response bodies as they stream
//! through Envoy, stores each fragment as an offset-tagged chunk, and
//! inspects the buffered bytes for blocked patterns. Chunks are released
//! as soon as the inspector has moved past them, so arbitrarily large or
//! slow bodies are inspected in bounded memory. If a pattern is found the
//! stream is answered with a 403 Forbidden response.
//!
//! Targets: wasm32-wasi (Envoy proxy-wasm ABI)

pub mod body;
pub mod config;
pub mod error;
pub mod filter;
pub mod inspect;
pub mod telemetry;
pub mod transaction;

use log::{debug, info, warn};
use proxy_wasm::traits::{Context, HttpContext, RootContext};
use proxy_wasm::types::{Action, ContextType, LogLevel};
use std::cell::RefCell;

pub use body::{BodyBuffer, BodyChunk, Dump, DumpEntry};
pub use config::FilterConfig;
pub use error::BodyError;
pub use filter::{BodyAction, BodyFilter};
pub use transaction::{Direction, Transaction};

// Thread-local storage for filter configuration
thread_local! {
    static CONFIG: RefCell<FilterConfig> = RefCell::new(FilterConfig::default());
}

/// Root context for filter lifecycle management
struct BodyRootContext {
    config: FilterConfig,
}

impl BodyRootContext {
    fn new() -> Self {
        Self {
            config: FilterConfig::default(),
        }
    }
}

impl Context for BodyRootContext {}

impl RootContext for BodyRootContext {
    fn on_configure(&mut self, _plugin_configuration_size: usize) -> bool {
        if let Some(config_bytes) = self.get_plugin_configuration() {
            match FilterConfig::from_bytes(&config_bytes) {
                Ok(config) => self.config = config,
                Err(e) => {
                    warn!("Ignoring plugin configuration, using defaults: {}", e);
                }
            }
        }

        // Store config in thread-local for HTTP contexts to access
        CONFIG.with(|c| {
            *c.borrow_mut() = self.config.clone();
        });

        info!(
            "Body filter initialized: {} blocked patterns, request={}, response={}, max body {} bytes",
            self.config.blocked_patterns.len(),
            self.config.inspect_request_body,
            self.config.inspect_response_body,
            self.config.max_body_size
        );

        true
    }

    fn create_http_context(&self, context_id: u32) -> Option<Box<dyn HttpContext>> {
        Some(Box::new(BodyHttpContext::new(context_id)))
    }

    fn get_type(&self) -> Option<ContextType> {
        Some(ContextType::HttpContext)
    }
}

/// HTTP context for per-stream processing
struct BodyHttpContext {
    context_id: u32,
    filter: BodyFilter,
    /// Track if we've already sent a block response
    response_sent: bool,
}

impl BodyHttpContext {
    fn new(context_id: u32) -> Self {
        let config = CONFIG.with(|c| c.borrow().clone());

        Self {
            context_id,
            filter: BodyFilter::new(context_id, config),
            response_sent: false,
        }
    }

    fn handle_body(&mut self, direction: Direction, body_size: usize, end_of_stream: bool) -> Action {
        if self.response_sent {
            return Action::Pause;
        }
        if !self.filter.wants_body(direction) {
            return Action::Continue;
        }

        debug!(
            "[context_id={}] {:?} body fragment: {} bytes, end_of_stream: {}",
            self.context_id, direction, body_size, end_of_stream
        );

        let fragment = match direction {
            Direction::Request => self.get_http_request_body(0, body_size),
            Direction::Response => self.get_http_response_body(0, body_size),
        };

        match self.filter.on_body(direction, fragment.as_deref(), end_of_stream) {
            BodyAction::Continue => Action::Continue,
            BodyAction::Block(m) => {
                self.send_block_response(&m.pattern_name);
                Action::Pause
            }
        }
    }

    /// Send a 403 Forbidden response with JSON error body
    fn send_block_response(&mut self, pattern: &str) {
        if self.response_sent {
            return;
        }
        self.response_sent = true;

        let error_body = serde_json::json!({
            "error": "Blocked Body Content",
            "pattern": pattern,
            "status": 403
        });
        let body_bytes = error_body.to_string();

        self.send_http_response(
            403,
            vec![
                ("content-type", "application/json"),
                ("x-body-filter-blocked", "true"),
            ],
            Some(body_bytes.as_bytes()),
        );
    }
}

impl Context for BodyHttpContext {}

impl HttpContext for BodyHttpContext {
    fn on_http_request_headers(&mut self, _num_headers: usize, _end_of_stream: bool) -> Action {
        if let Some(path) = self.get_http_request_header(":path") {
            debug!("[context_id={}] Request path: {}", self.context_id, path);
        }
        Action::Continue
    }

    fn on_http_request_body(&mut self, body_size: usize, end_of_stream: bool) -> Action {
        self.handle_body(Direction::Request, body_size, end_of_stream)
    }

    fn on_http_response_body(&mut self, body_size: usize, end_of_stream: bool) -> Action {
        self.handle_body(Direction::Response, body_size, end_of_stream)
    }

    fn on_log(&mut self) {
        self.filter.teardown();
        if self.filter.is_blocked() {
            info!("[context_id={}] Stream was BLOCKED by body filter", self.context_id);
        } else {
            debug!("[context_id={}] Stream processing complete", self.context_id);
        }
    }
}

// Register the filter with proxy-wasm runtime
proxy_wasm::main! {{
    proxy_wasm::set_log_level(LogLevel::Debug);
    proxy_wasm::set_root_context(|_| -> Box<dyn RootContext> {
        Box::new(BodyRootContext::new())
    });
}}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_context_uses_stored_config() {
        CONFIG.with(|c| {
            *c.borrow_mut() = FilterConfig {
                inspect_request_body: false,
                ..Default::default()
            };
        });

        let ctx = BodyHttpContext::new(9);
        assert!(!ctx.filter.wants_body(Direction::Request));
        assert!(ctx.filter.wants_body(Direction::Response));
        assert_eq!(ctx.filter.transaction().id(), 9);
    }
}
