//! Integration test common infrastructure.
//!
//! Provides utilities for spawning the API binary against a temporary
//! configuration and for standing up fake upstream services.

#![allow(dead_code)]

pub mod server;
pub mod upstream;

#[allow(unused_imports)]
pub use server::TestServer;
#[allow(unused_imports)]
pub use upstream::FakeUpstream;
