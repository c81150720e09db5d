mod client;

pub use client::MemeApiClient;
