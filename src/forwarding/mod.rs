pub mod client;

pub use client::ForwardingClient;
