//! Repository manager protocol: connection probing, the staging REST
//! client, artifact upload, checksum sidecars, and parsing of error and
//! activity responses.

pub mod activity;
pub mod auth;
pub mod checksum;
pub mod client;
pub mod connection;
pub mod error_body;
pub mod repository;
pub mod service;
pub mod upload;
pub mod wait;
pub mod wire;
