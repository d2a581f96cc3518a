//! Database layer for the scanner workers
//!
//! Provides MongoDB storage for the domain graph.

pub mod mongo;
pub mod schemas;

pub use mongo::{MongoClient, MongoCollection};
pub use schemas::{ClaimDoc, DomainDoc, DomainSelectorEdge, OrgDoc, SelectorDoc};
