use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::DirBuilder;

use crate::session::{ExtractionRun, Listing, LISTING_COLUMNS};

use super::{PersistenceSink, SinkError};


/// Writes every listing of a run to `<stem>.csv` and `<stem>.json` inside one directory
pub(crate) struct FileExport {
    dir: PathBuf,
    stem: String
}


impl FileExport {
    pub(crate) const NAME: &'static str = "file_export";

    pub(crate) fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self { dir: dir.into(), stem: stem.into() }
    }

    pub(crate) fn csv_path(&self) -> PathBuf {
        self.dir.join(format!("{}.csv", self.stem))
    }

    pub(crate) fn json_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.stem))
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }
}


fn to_csv(listings: &[Listing]) -> Result<Vec<u8>, SinkError> {
    let mut writer = csv::Writer::from_writer(vec![]);
    if listings.is_empty() {
        // Serializing writes the header with the first record, an empty run still gets one
        writer.write_record(LISTING_COLUMNS)?;
    }
    for listing in listings {
        writer.serialize(listing)?;
    }
    writer.into_inner().map_err(|e| SinkError::Io(e.into_error()))
}


#[async_trait]
impl PersistenceSink for FileExport {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn persist(&self, _run: &ExtractionRun, listings: &[Listing]) -> Result<(), SinkError> {
        DirBuilder::new().recursive(true).create(&self.dir).await?;

        tokio::fs::write(self.csv_path(), to_csv(listings)?).await?;
        tracing::info!(path = %self.csv_path().display(), "Listings saved");

        tokio::fs::write(self.json_path(), serde_json::to_vec_pretty(listings)?).await?;
        tracing::info!(path = %self.json_path().display(), "Listings also saved as JSON");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use crate::locators::NOT_AVAILABLE;
    use crate::sinks::tests::sample_listings;

    use super::*;

    #[tokio::test]
    async fn writes_csv_and_json_with_fixed_columns() {
        let dir = tempfile::tempdir().unwrap();
        let export = FileExport::new(dir.path().join("out"), "bumeran_jobs");
        let mut listings = sample_listings(2);
        listings[1].location = NOT_AVAILABLE.to_string();
        let run = ExtractionRun::new("test", 1, listings.len(), true);

        export.persist(&run, &listings).await.unwrap();

        let csv = std::fs::read_to_string(export.csv_path()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), LISTING_COLUMNS.join(","));
        assert!(lines.next().unwrap().starts_with("Practicante 1,Acme SAC,\"Lima, Lima\",Publicado hoy,"));
        assert!(lines.next().unwrap().contains(",No disponible,"));
        assert!(lines.next().is_none());

        let json: Vec<serde_json::Value> = serde_json::from_str(&std::fs::read_to_string(export.json_path()).unwrap()).unwrap();
        assert_eq!(json.len(), 2);
        assert_eq!(json[1]["location"], NOT_AVAILABLE);
        assert_eq!(json[0]["source_page"], 1);
        let extracted_at = json[0]["extracted_at"].as_str().unwrap();
        assert_eq!(extracted_at.parse::<chrono::DateTime<chrono::Utc>>().unwrap(), listings[0].extracted_at);
    }

    #[tokio::test]
    async fn empty_run_still_gets_a_header_and_an_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let export = FileExport::new(dir.path(), "empty");
        let run = ExtractionRun::new("test", 1, 0, true);

        export.persist(&run, &[]).await.unwrap();

        assert_eq!(std::fs::read_to_string(export.csv_path()).unwrap().trim_end(), LISTING_COLUMNS.join(","));
        assert_eq!(std::fs::read_to_string(export.json_path()).unwrap(), "[]");
        assert!(export.dir().is_dir());
    }
}
