//! web-cat: a minimal HTTP content store.
//!
//! Clients `POST /` any body with a content type and get back a short key;
//! `GET`, `POST` (overwrite) and `DELETE` on `/{key}` act on the stored
//! record. Records live one file per key under the data directory.

pub mod config;
pub mod handler;
pub mod http;
pub mod keygen;
pub mod logger;
pub mod server;
pub mod store;
