//! Resolution of one entry into images on disk.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, error, info, instrument};

use super::{CrawlError, SharedContext, WorkerPool};
use crate::download::{EnsureOutcome, album_dir, download_target};
use crate::model::{ContentId, ImageReference, ItemKind, ItemMetadata};
use crate::page::{
    PageError, album_image_urls, album_ordinal, find_original_image, parse_item_metadata,
};
use crate::session::Session;

/// Outcome of resolving one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    /// Resolved entry.
    pub id: ContentId,
    /// Entry layout.
    pub kind: ItemKind,
    /// Parsed title and artist.
    pub meta: ItemMetadata,
    /// Images fetched over the network.
    pub downloaded: usize,
    /// Images already on disk.
    pub skipped: usize,
    /// Album pages that failed (always 0 for singles).
    pub failed: usize,
}

/// Turns one identifier and its kind into downloaded images.
///
/// Each resolver owns its [`Session`], whose `Referer` points at the entry's
/// own page, so concurrently resolved entries never share referer or cookies.
#[derive(Debug)]
pub struct ItemResolver {
    ctx: SharedContext,
    id: ContentId,
    kind: ItemKind,
    session: Session,
}

impl ItemResolver {
    /// Creates a resolver with a fresh session scoped to this entry.
    ///
    /// Singles refer from their detail page, albums from their listing page.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Session`] if the session cannot be built.
    pub fn new(ctx: SharedContext, id: ContentId, kind: ItemKind) -> Result<Self, CrawlError> {
        let mut session = ctx.new_session()?;
        let referer = match kind {
            ItemKind::Single => ctx.endpoints().detail_url(&id),
            ItemKind::Album => ctx.endpoints().album_url(&id),
        };
        session.set_referer(&referer)?;
        Ok(Self {
            ctx,
            id,
            kind,
            session,
        })
    }

    /// Session used for this entry's page and retry requests.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Resolves the entry according to its kind.
    ///
    /// # Errors
    ///
    /// See [`resolve_single`](Self::resolve_single) and
    /// [`resolve_album`](Self::resolve_album).
    pub async fn resolve(self) -> Result<ItemReport, CrawlError> {
        match self.kind {
            ItemKind::Single => self.resolve_single().await,
            ItemKind::Album => self.resolve_album().await,
        }
    }

    /// Fetches the detail page and downloads its original image.
    ///
    /// A page without an original image is logged and yields an empty report.
    ///
    /// # Errors
    ///
    /// Returns page, metadata or download errors for this entry.
    #[instrument(skip(self), fields(illust_id = %self.id))]
    pub async fn resolve_single(self) -> Result<ItemReport, CrawlError> {
        info!("getting single image");
        let detail = self
            .session
            .fetch_page(&self.ctx.endpoints().detail_url(&self.id))
            .await?;
        debug!("detail page fetched");

        let meta = parse_item_metadata(&detail).map_err(|e| CrawlError::page(&self.id, e))?;
        let mut report = self.empty_report(meta.clone());

        let image = match find_original_image(&detail) {
            Ok(url) => ImageReference::single(url),
            Err(PageError::ImageNotFound) => {
                error!(title = %meta.title, "no image URL found on detail page");
                return Ok(report);
            }
            Err(e) => return Err(CrawlError::page(&self.id, e)),
        };
        debug!(image = %image, "original image URL found");

        let target = download_target(self.ctx.output_root(), &meta, &image);
        match self
            .ctx
            .downloader()
            .ensure(&self.session, &image.source_url, &target)
            .await?
        {
            EnsureOutcome::Skipped => report.skipped += 1,
            EnsureOutcome::Downloaded { .. } => report.downloaded += 1,
        }

        info!(name = %meta.display_name(), "single image done");
        Ok(report)
    }

    /// Fetches the detail and listing pages, then downloads every album page
    /// through a bounded pool.
    ///
    /// # Errors
    ///
    /// Returns page or metadata errors, directory creation failures, and any
    /// fatal error raised by the album's download pool.
    #[instrument(skip(self), fields(illust_id = %self.id))]
    pub async fn resolve_album(self) -> Result<ItemReport, CrawlError> {
        info!("getting album");
        let detail = self
            .session
            .fetch_page(&self.ctx.endpoints().detail_url(&self.id))
            .await?;
        debug!("detail page fetched");
        let meta = parse_item_metadata(&detail).map_err(|e| CrawlError::page(&self.id, e))?;

        let listing = self
            .session
            .fetch_page(&self.ctx.endpoints().album_url(&self.id))
            .await?;
        let urls = album_image_urls(&listing);
        debug!(images = urls.len(), "album listing parsed");

        let dir = album_dir(self.ctx.output_root(), &meta);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CrawlError::io(&dir, e))?;

        let mut report = self.empty_report(meta.clone());
        let job = Arc::new(AlbumJob {
            id: self.id.clone(),
            meta: meta.clone(),
            ctx: Arc::clone(&self.ctx),
            session: self.session,
            progress: AtomicUsize::new(0),
            downloaded: AtomicUsize::new(0),
        });

        let pool = WorkerPool::new(
            "album-downloads",
            self.ctx.options().album_download_workers,
            self.ctx.abort().clone(),
        );
        let task_job = Arc::clone(&job);
        let stats = pool
            .run(urls, move |url| {
                let job = Arc::clone(&task_job);
                async move { job.fetch_page_image(url).await }
            })
            .await?;

        report.downloaded = job.downloaded.load(Ordering::SeqCst);
        report.skipped = stats.completed.saturating_sub(report.downloaded);
        report.failed = stats.failed;
        info!(
            name = %meta.display_name(),
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            "album done"
        );
        Ok(report)
    }

    fn empty_report(&self, meta: ItemMetadata) -> ItemReport {
        ItemReport {
            id: self.id.clone(),
            kind: self.kind,
            meta,
            downloaded: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

/// State shared by one album's download tasks.
struct AlbumJob {
    id: ContentId,
    meta: ItemMetadata,
    ctx: SharedContext,
    session: Session,
    progress: AtomicUsize,
    downloaded: AtomicUsize,
}

impl AlbumJob {
    async fn fetch_page_image(&self, url: String) -> Result<(), CrawlError> {
        let ordinal = album_ordinal(&url).map_err(|e| CrawlError::page(&self.id, e))?;
        let image = ImageReference::album_page(url, ordinal);
        let target = download_target(self.ctx.output_root(), &self.meta, &image);

        let outcome = self
            .ctx
            .downloader()
            .ensure(&self.session, &image.source_url, &target)
            .await?;
        if matches!(outcome, EnsureOutcome::Downloaded { .. }) {
            self.downloaded.fetch_add(1, Ordering::SeqCst);
        }

        let done = self.progress.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(name = %self.meta.display_name(), image = %image, done, "album page done");
        Ok(())
    }
}
