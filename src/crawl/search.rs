//! One search page: fetch, classify, and fan out resolution work.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::{CrawlError, ItemResolver, PoolStats, SharedContext, WorkerPool};
use crate::model::{ContentId, ItemKind};
use crate::page::parse_search_results;

/// Outcome of one processed search page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageReport {
    /// 1-based page number.
    pub page: u32,
    /// Distinct single-image entries found.
    pub singles: usize,
    /// Distinct album entries found.
    pub albums: usize,
    /// Fragments skipped for an unknown layout.
    pub skipped: usize,
    /// Single-image pool counts.
    pub single_stats: PoolStats,
    /// Album pool counts.
    pub album_stats: PoolStats,
}

/// Drives one search page through both resolution pools.
#[derive(Debug, Clone)]
pub struct SearchOrchestrator {
    ctx: SharedContext,
}

impl SearchOrchestrator {
    /// Creates an orchestrator over a shared run context.
    #[must_use]
    pub fn new(ctx: SharedContext) -> Self {
        Self { ctx }
    }

    /// Fetches search page `page` for `keyword`, then resolves its singles and,
    /// once they are all done, its albums.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Session`] if the search page cannot be fetched,
    /// and any fatal error raised by either pool.
    #[instrument(skip(self))]
    pub async fn process_page(&self, keyword: &str, page: u32) -> Result<PageReport, CrawlError> {
        info!("beginning page");
        let url = self.ctx.endpoints().search_url(keyword, page);
        debug!(url = %url, "search URL");

        let session = self.ctx.new_session()?;
        let html = session.fetch_page(&url).await?;
        let results = parse_search_results(&html);
        debug!(singles = ?results.singles, albums = ?results.albums, "classified results");
        if results.skipped > 0 {
            debug!(skipped = results.skipped, "unclassified fragments skipped");
        }

        let mut report = PageReport {
            page,
            singles: results.singles.len(),
            albums: results.albums.len(),
            skipped: results.skipped,
            ..PageReport::default()
        };

        let options = *self.ctx.options();
        report.single_stats = self
            .resolve_all("singles", options.single_workers, results.singles, ItemKind::Single)
            .await?;
        report.album_stats = self
            .resolve_all("albums", options.album_workers, results.albums, ItemKind::Album)
            .await?;

        info!(
            singles = report.singles,
            albums = report.albums,
            failed = report.single_stats.failed + report.album_stats.failed,
            "page done"
        );
        Ok(report)
    }

    async fn resolve_all(
        &self,
        name: &'static str,
        width: usize,
        ids: BTreeSet<ContentId>,
        kind: ItemKind,
    ) -> Result<PoolStats, CrawlError> {
        if ids.is_empty() {
            return Ok(PoolStats::default());
        }
        let pool = WorkerPool::new(name, width, self.ctx.abort().clone())
            .with_throttle(self.ctx.options().throttle);
        let ctx = Arc::clone(&self.ctx);
        pool.run(ids, move |id| {
            let ctx = Arc::clone(&ctx);
            async move {
                let report = ItemResolver::new(ctx, id, kind)?.resolve().await?;
                debug!(
                    illust_id = %report.id,
                    downloaded = report.downloaded,
                    skipped = report.skipped,
                    "item resolved"
                );
                Ok(())
            }
        })
        .await
    }
}
