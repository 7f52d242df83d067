//! HTTP host: composes the registered modules into one server.

pub mod app;
