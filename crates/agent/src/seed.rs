//! Demo data: two authors with a book and an award each, and the shared
//! FAQ passages.

use folio_core::error::SearchError;
use folio_core::record::{RecordType, StructuredRecord};
use folio_memory::SimilarityIndex;
use tracing::{info, warn};

/// A FAQ passage with a stable id and topic tag.
pub struct FaqEntry {
    pub id: &'static str,
    pub topic: &'static str,
    pub text: &'static str,
}

pub const DEMO_FAQS: &[FaqEntry] = &[
    FaqEntry {
        id: "faq_book_status_stages",
        topic: "Book Status & Manuscript Tracking",
        text: "Every manuscript moves through these stages: submitted, under_review, in_editing, \
               in_production, and published. You can ask the assistant for your book's current \
               status at any time. Stage notes from your editor are attached to the status and \
               describe what is happening right now.",
    },
    FaqEntry {
        id: "faq_editing_timeline",
        topic: "Book Status & Manuscript Tracking",
        text: "The editing phase typically takes 4-6 weeks. It covers a structural edit, a line \
               edit, and a final proofread. Your editor will contact you if revisions are \
               needed, and the clock pauses while a revision is with you.",
    },
    FaqEntry {
        id: "faq_award_eligibility",
        topic: "Award Eligibility & Submission",
        text: "To be eligible for our annual awards a book must be published by us within the \
               award year and submitted before the nomination deadline. Each category has its \
               own criteria; the eligibility assessment on your award record explains how your \
               submission was judged.",
    },
    FaqEntry {
        id: "faq_award_stages",
        topic: "Award Eligibility & Submission",
        text: "Award submissions progress from submitted to nominated, then to shortlisted, and \
               finally winner or not_selected. Nominees are notified by email when the \
               shortlist is announced, usually eight weeks after the nomination deadline.",
    },
    FaqEntry {
        id: "faq_publishing_timeline",
        topic: "Publishing Process & Timelines",
        text: "From signed contract to publication usually takes six to nine months: about a \
               month of review, 4-6 weeks of editing, then design, typesetting, and printing. \
               Digital editions are released on major platforms on the same day as print.",
    },
    FaqEntry {
        id: "faq_after_publication",
        topic: "Publishing Process & Timelines",
        text: "After publication your book is listed on major retail platforms within two weeks. \
               Royalty statements are issued quarterly, and marketing support continues for the \
               first six months after release.",
    },
];

/// Book and award records for the demo authors `alice` and `bob`.
pub fn demo_records() -> Vec<StructuredRecord> {
    vec![
        StructuredRecord::new(RecordType::Book, "alice")
            .field("book_id", "book_001")
            .field("title", "The Digital Revolution")
            .field("status", "in_editing")
            .field(
                "stage_notes",
                "Currently in final editing phase. Expected completion in 2 weeks.",
            ),
        StructuredRecord::new(RecordType::Award, "alice")
            .field("award_name", "Tech Innovation Award 2024")
            .field("award_stage", "nominated")
            .field(
                "eligibility",
                "Eligible - meets all criteria for emerging technology category",
            ),
        StructuredRecord::new(RecordType::Book, "bob")
            .field("book_id", "book_002")
            .field("title", "Future Technologies")
            .field("status", "published")
            .field(
                "stage_notes",
                "Successfully published last month. Available on major platforms.",
            ),
        StructuredRecord::new(RecordType::Award, "bob")
            .field("award_name", "Best Science Fiction Novel 2023")
            .field("award_stage", "winner")
            .field(
                "eligibility",
                "Winner - recognized for outstanding contribution to science fiction",
            ),
    ]
}

/// Index every demo FAQ passage under its fixed id. Re-running replaces
/// the passages rather than duplicating them.
///
/// When the partition was built with an embedding model of another
/// dimension, it is cleared and rebuilt from the demo passages.
pub async fn seed_faqs(index: &SimilarityIndex) -> Result<usize, SearchError> {
    match index_demo_faqs(index).await {
        Err(SearchError::DimensionMismatch { expected, actual }) => {
            warn!(
                expected,
                actual,
                partition = index.partition(),
                "Embedding dimension changed, rebuilding the FAQ partition"
            );
            index.clear().await?;
            index_demo_faqs(index).await?;
        }
        other => other?,
    }
    info!(count = DEMO_FAQS.len(), "Seeded FAQ passages");
    Ok(DEMO_FAQS.len())
}

async fn index_demo_faqs(index: &SimilarityIndex) -> Result<(), SearchError> {
    for entry in DEMO_FAQS {
        let mut extra = serde_json::Map::new();
        extra.insert("topic".into(), entry.topic.into());
        index
            .index(entry.text, Some(entry.id.to_string()), Some(extra))
            .await?;
    }
    Ok(())
}
