pub mod analysis;
pub mod config;
pub mod extractors;
pub mod logging;
pub mod response;
pub mod routes;
pub mod session;
pub mod state;
