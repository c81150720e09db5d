//! Four Meme Networking - HTTP client for the four.meme REST API

pub mod http;

pub use http::MemeApiClient;
