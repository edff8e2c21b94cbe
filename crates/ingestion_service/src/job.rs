use crate::IngestionError;
use crate::client::{LivesClient, LivesPage};
use chrono::Utc;
use datastore::{Repository, to_document};
use domain::LiveStreamRecord;
use serde::Serialize;
use std::sync::Arc;

/// Scan limits and destination for one ingestion run
#[derive(Debug, Clone)]
pub struct IngestionSettings {
    pub collection: String,
    pub page_size: usize,
    pub max_pages: usize,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            collection: "streamers".to_string(),
            page_size: 20,
            max_pages: 100,
        }
    }
}

/// Why a scan stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    PageCeiling,
    EmptyPage,
    ShortPage,
    NoNextToken,
    MalformedResponse,
}

/// Counters for one completed scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub pages: usize,
    /// Entries the upstream sent, decodable or not
    pub received: usize,
    /// Entries dropped because they did not decode as a listing record
    pub undecodable: usize,
    pub written: usize,
    /// Records dropped for not being in the game category
    pub filtered: usize,
    /// Records whose write failed
    pub failed: usize,
    pub stop: StopReason,
}

/// Pulls live listings page by page and upserts game broadcasts into the store
pub struct IngestionJob {
    client: LivesClient,
    repo: Arc<dyn Repository>,
    settings: IngestionSettings,
}

impl IngestionJob {
    pub fn new(client: LivesClient, repo: Arc<dyn Repository>, settings: IngestionSettings) -> Self {
        Self {
            client,
            repo,
            settings,
        }
    }

    pub fn settings(&self) -> &IngestionSettings {
        &self.settings
    }

    /// Run one full scan.
    ///
    /// Returns an error only when the upstream call fails; the pages written
    /// before the failure stay in the store.
    pub async fn run(&self) -> Result<IngestionReport, IngestionError> {
        let IngestionSettings {
            collection,
            page_size,
            max_pages,
        } = &self.settings;

        tracing::info!(collection = %collection, page_size, max_pages, "Starting live listings scan");

        let mut report = IngestionReport {
            pages: 0,
            received: 0,
            undecodable: 0,
            written: 0,
            filtered: 0,
            failed: 0,
            stop: StopReason::PageCeiling,
        };
        let mut next_token: Option<String> = None;

        for _ in 0..*max_pages {
            let page = match self.client.fetch_page(*page_size, next_token.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(
                        pages = report.pages,
                        written = report.written,
                        error = %e,
                        "Live listings request failed, aborting scan"
                    );
                    return Err(e);
                }
            };
            report.pages += 1;

            let (records, raw_count, next) = match page {
                LivesPage::Malformed(body) => {
                    tracing::error!(body = %body, "Unexpected listings response, stopping scan");
                    report.stop = StopReason::MalformedResponse;
                    break;
                }
                LivesPage::Listing {
                    records,
                    raw_count,
                    next,
                } => (records, raw_count, next),
            };

            if raw_count == 0 {
                tracing::info!(pages = report.pages, "Listings page was empty, stopping scan");
                report.stop = StopReason::EmptyPage;
                break;
            }

            // Stop rules look at what the upstream sent, not at what decoded.
            let received = raw_count;
            report.received += received;
            report.undecodable += raw_count - records.len();
            self.store_page(collection, records, &mut report).await;

            tracing::info!(
                page = report.pages,
                received,
                written = report.written,
                "Stored listings page"
            );

            match next {
                None => {
                    report.stop = StopReason::NoNextToken;
                    break;
                }
                Some(_) if received < *page_size => {
                    report.stop = StopReason::ShortPage;
                    break;
                }
                Some(token) => next_token = Some(token),
            }
        }

        tracing::info!(
            pages = report.pages,
            written = report.written,
            filtered = report.filtered,
            failed = report.failed,
            undecodable = report.undecodable,
            stop = ?report.stop,
            "Live listings scan finished"
        );
        Ok(report)
    }

    async fn store_page(
        &self,
        collection: &str,
        records: Vec<LiveStreamRecord>,
        report: &mut IngestionReport,
    ) {
        for mut record in records {
            if !record.is_game() {
                report.filtered += 1;
                continue;
            }

            record.updated_at = Some(Utc::now());
            let written = match to_document(&record) {
                Ok(fields) => self.repo.upsert(collection, &record.channel_id, fields).await,
                Err(e) => Err(e),
            };

            match written {
                Ok(()) => report.written += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        channel_id = %record.channel_id,
                        channel_name = %record.channel_name,
                        error = %e,
                        "Failed to store channel"
                    );
                }
            }
        }
    }
}
