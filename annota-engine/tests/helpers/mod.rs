//! Shared test utilities for annota-engine integration tests

#![allow(dead_code)]

pub mod fakes;

use annota_common::events::EventBus;
use annota_common::kv::MemoryKvStore;
use annota_common::SessionContext;
use annota_engine::models::{SyncStatus, Taxonomy, TaxonomyNode};
use std::sync::Arc;

/// Fresh session over an in-memory store
pub fn session_context() -> SessionContext {
    SessionContext::new(Arc::new(MemoryKvStore::new()), EventBus::new(256))
}

pub fn synced(key: &str, max_depth: u32) -> Taxonomy {
    Taxonomy::new(key, max_depth).with_sync_status(SyncStatus::Completed)
}

pub fn node(level: u32, code: &str, parent: Option<&str>, is_leaf: bool) -> TaxonomyNode {
    TaxonomyNode {
        code: code.to_string(),
        label: format!("Node {}", code),
        level,
        parent_code: parent.map(str::to_string),
        is_leaf,
        definition: None,
        examples: None,
    }
}

/// Small ISCO-like tree, max depth 3
///
/// ```text
/// 1 ── 11 (leaf)
///   └─ 12 ── 121 (leaf), 123 (leaf)
/// 5 ── 51 ── 512 "Cooks" (leaf)
/// ```
pub fn isco_tree() -> Vec<TaxonomyNode> {
    let mut cooks = node(3, "512", Some("51"), true);
    cooks.label = "Cooks".to_string();
    vec![
        node(1, "1", None, false),
        node(1, "5", None, false),
        node(2, "11", Some("1"), true),
        node(2, "12", Some("1"), false),
        node(2, "51", Some("5"), false),
        node(3, "121", Some("12"), true),
        node(3, "123", Some("12"), true),
        cooks,
    ]
}
