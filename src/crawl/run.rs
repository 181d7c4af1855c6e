//! Top-level page loop of a crawl run.

use std::sync::Arc;

use tracing::{error, info, instrument};

use super::{CrawlContext, CrawlError, PageReport, SearchOrchestrator, SharedContext};

/// Summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Reports of the pages that were processed.
    pub pages: Vec<PageReport>,
    /// Pages whose search results could not be fetched or processed.
    pub failed_pages: Vec<u32>,
}

impl RunReport {
    /// Entries resolved successfully over all pages.
    #[must_use]
    pub fn items_completed(&self) -> usize {
        self.pages
            .iter()
            .map(|p| p.single_stats.completed + p.album_stats.completed)
            .sum()
    }

    /// Entries that failed over all pages.
    #[must_use]
    pub fn items_failed(&self) -> usize {
        self.pages
            .iter()
            .map(|p| p.single_stats.failed + p.album_stats.failed)
            .sum()
    }
}

/// Iterates search pages one after another.
#[derive(Debug, Clone)]
pub struct RunController {
    ctx: SharedContext,
}

impl RunController {
    /// Creates a controller owning the run context.
    #[must_use]
    pub fn new(ctx: CrawlContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    /// Shared run context.
    #[must_use]
    pub fn context(&self) -> &CrawlContext {
        &self.ctx
    }

    /// Processes pages `1..=pages` for `keyword` sequentially.
    ///
    /// The output root is created before the first page. A page that fails for
    /// a non-fatal reason is logged and the run moves on.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Io`] if the output root cannot be created and the
    /// fatal error that aborted the run, if any.
    #[instrument(skip(self))]
    pub async fn run(&self, keyword: &str, pages: u32) -> Result<RunReport, CrawlError> {
        let root = self.ctx.output_root();
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| CrawlError::io(root, e))?;
        info!(root = %root.display(), "starting run");

        let orchestrator = SearchOrchestrator::new(Arc::clone(&self.ctx));
        let mut report = RunReport::default();

        for page in 1..=pages {
            match orchestrator.process_page(keyword, page).await {
                Ok(page_report) => report.pages.push(page_report),
                Err(e) if e.is_fatal() => {
                    error!(page, error = %e, "run aborted");
                    return Err(e);
                }
                Err(e) => {
                    error!(page, error = %e, "page failed; continuing with next page");
                    report.failed_pages.push(page);
                }
            }
        }

        info!(
            pages = report.pages.len(),
            failed_pages = report.failed_pages.len(),
            completed = report.items_completed(),
            failed = report.items_failed(),
            "run complete"
        );
        Ok(report)
    }
}
