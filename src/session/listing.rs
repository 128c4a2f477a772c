use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::locators::FieldValues;

/// Bumped whenever the field set of [`Listing`] changes
pub(crate) const LISTING_SCHEMA_VERSION: u32 = 1;

/// Column order of every tabular export, matching the field order of [`Listing`]
pub(crate) const LISTING_COLUMNS: [&str; 7] = [
    "title",
    "company",
    "location",
    "published",
    "url",
    "source_page",
    "extracted_at"
];


/// One job listing. Every field is always present, fields that could not be
/// located hold the "No disponible" sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Listing {
    pub(crate) title: String,
    pub(crate) company: String,
    pub(crate) location: String,
    /// Publication date exactly as the site prints it, e.g. "Publicado hace 2 días"
    pub(crate) published: String,
    pub(crate) url: String,
    /// 1-based results page the listing was found on
    pub(crate) source_page: u32,
    pub(crate) extracted_at: DateTime<Utc>
}


impl Listing {
    pub(crate) fn new(values: FieldValues, source_page: u32, extracted_at: DateTime<Utc>) -> Self {
        let FieldValues { title, company, location, published, url } = values;
        Self { title, company, location, published, url, source_page, extracted_at }
    }
}


/// Metadata of one full session, written once as the parent of its listings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExtractionRun {
    pub(crate) id: Uuid,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) source_label: String,
    pub(crate) total_pages: u32,
    pub(crate) total_listings: usize,
    pub(crate) used_automation: bool,
    pub(crate) schema_version: u32
}


impl ExtractionRun {
    pub(crate) fn new(source_label: impl Into<String>, total_pages: u32, total_listings: usize, used_automation: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source_label: source_label.into(),
            total_pages,
            total_listings,
            used_automation,
            schema_version: LISTING_SCHEMA_VERSION
        }
    }
}
