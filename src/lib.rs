// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod exception;
pub mod handler;
pub mod mime;
pub mod param;
pub mod request;
pub mod resolver;
pub mod server;
pub mod util;

pub use config::{Config, ServerMode};
pub use exception::Exception;
pub use param::Status;
pub use request::Request;
pub use util::HtmlBuilder;
