//! Veritree: Merkle-Backed Content Integrity
//!
//! The content-integrity core of an artifact registry: hash-keyed blob
//! storage with deduplication and atomic writes, Merkle-tree modelling
//! of artifact file trees, signatures over root hashes, and tamper
//! detection by recomputing hashes against stored content.

pub mod cas;
pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod graph;
pub mod hash;
pub mod logging;
pub mod repository;
pub mod service;
