//! # Actix Middleware Library
//!
//! Request context and access guards for actix-web services
//!
//! ## Modules
//! - `context`: per-request context scope and correlation id echo
//! - `access_guard`: authentication and role guard per resource
//! - `logging`: request logging with the current context
//! - `principal`: extractor for the authenticated principal
//! - `error`: guard rejections as HTTP responses
//!
//! ## Ordering
//! `.wrap()` calls run last-registered first, so register `Logging` before
//! `ContextMiddleware`:
//!
//! ```rust,ignore
//! let context = ContextMiddleware::new(ContextConfig::from_env());
//! App::new()
//!     .wrap(Logging::new(context.context_service()))
//!     .wrap(context)
//! ```

pub mod access_guard;
pub mod context;
pub mod error;
pub mod http_adapter;
pub mod logging;
pub mod principal;

pub use access_guard::AccessGuard;
pub use context::ContextMiddleware;
pub use error::HttpRejection;
pub use http_adapter::HttpAdapter;
pub use logging::Logging;
pub use principal::CurrentPrincipal;
