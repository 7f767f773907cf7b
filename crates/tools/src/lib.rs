//! Tools the Folio reasoning loop can call.
//!
//! Two registries can be built for a session:
//!
//! - [`full_registry`]: FAQ search plus the identity-scoped record tools.
//!   Requires a record store.
//! - [`reduced_registry`]: FAQ search only. Always available.
//!
//! Record tools receive the caller's identity through [`BoundParams`] when
//! they are constructed; the model never supplies it.

pub mod award_status;
pub mod book_status;
pub mod faq_search;
pub mod profile_summary;

use folio_core::error::ToolError;
use folio_core::record::RecordStore;
use folio_core::tool::{BoundParams, ToolRegistry};
use folio_memory::SimilarityIndex;
use std::sync::Arc;

pub use award_status::AwardStatusTool;
pub use book_status::BookStatusTool;
pub use faq_search::{FaqSearchSettings, FaqSearchTool, NO_INFORMATION};
pub use profile_summary::ProfileSummaryTool;

/// Shared handles the tools are built from.
#[derive(Clone)]
pub struct Toolkit {
    pub index: Arc<SimilarityIndex>,
    pub records: Option<Arc<dyn RecordStore>>,
    pub search: FaqSearchSettings,
}

impl Toolkit {
    pub fn new(index: Arc<SimilarityIndex>) -> Self {
        Self {
            index,
            records: None,
            search: FaqSearchSettings::default(),
        }
    }

    pub fn with_records(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = Some(records);
        self
    }

    pub fn with_search(mut self, search: FaqSearchSettings) -> Self {
        self.search = search;
        self
    }
}

/// FAQ search plus book, award, and profile tools bound to `bound`.
pub fn full_registry(toolkit: &Toolkit, bound: &BoundParams) -> Result<ToolRegistry, ToolError> {
    let records = toolkit
        .records
        .clone()
        .ok_or_else(|| ToolError::NotConfigured("record store".into()))?;

    let mut registry = reduced_registry(toolkit);
    registry.register(Box::new(BookStatusTool::new(records.clone(), bound.clone())));
    registry.register(Box::new(AwardStatusTool::new(records.clone(), bound.clone())));
    registry.register(Box::new(ProfileSummaryTool::new(records, bound.clone())));
    Ok(registry)
}

/// FAQ search only.
pub fn reduced_registry(toolkit: &Toolkit) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(FaqSearchTool::new(
        toolkit.index.clone(),
        toolkit.search,
    )));
    registry
}
