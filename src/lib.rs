//! Bounded-depth web crawler engine: page-node parsing, DFS/BFS
//! traversal, the batching output pipeline, favicon resolution with a
//! content-addressed cache, and the resume-after-restart protocol.
//!
//! External collaborators (a real HTTP front end, a persistent result
//! store, a production HTTP client pool, a cloud blob bucket, a
//! distributed task queue) are reached only through the traits in
//! [`store`], [`http_client`], [`blobstore`], and [`task`]; this crate
//! ships in-memory/filesystem reference implementations of all four.

pub mod bfs;
pub mod blobstore;
pub mod config;
pub mod crawler;
pub mod dfs;
pub mod error;
pub mod favicon;
pub mod host;
pub mod http_client;
pub mod idgen;
pub mod job;
pub mod links;
pub mod page;
pub mod resume;
pub mod store;
pub mod strategy;
pub mod task;
