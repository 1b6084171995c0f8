//! Bulk loading of pre-embedded points into a collection

use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::VectorStoreProvider;
use crate::types::Point;

/// Points read from an archive file, validated to share one dimension
#[derive(Debug, Clone)]
pub struct PointsArchive {
    points: Vec<Point>,
    dimensions: usize,
}

impl PointsArchive {
    /// Read JSON lines, or a JSON array when the file ends in `.json`
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let is_array = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let points = if is_array {
            Self::parse_array(&raw)?
        } else {
            Self::parse_lines(&raw)?
        };

        let archive = Self::from_points(points)?;
        tracing::info!(
            "Loaded {} points ({} dims) from {}",
            archive.len(),
            archive.dimensions,
            path.display()
        );
        Ok(archive)
    }

    /// One point per non-blank line
    pub fn parse_lines(raw: &str) -> Result<Vec<Point>> {
        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| {
                    Error::invalid_input(format!("Line {}: malformed point: {}", i + 1, e))
                })
            })
            .collect()
    }

    pub fn parse_array(raw: &str) -> Result<Vec<Point>> {
        serde_json::from_str(raw)
            .map_err(|e| Error::invalid_input(format!("Malformed point array: {}", e)))
    }

    /// Validate that the archive is non-empty and every vector has the first one's length
    pub fn from_points(points: Vec<Point>) -> Result<Self> {
        let first = points
            .first()
            .ok_or_else(|| Error::invalid_input("Archive contains no points"))?;
        let dimensions = first.dimensions();

        for (i, point) in points.iter().enumerate() {
            if point.vector.is_empty() {
                return Err(Error::invalid_input(format!(
                    "Point {} ({}): empty vector",
                    i + 1,
                    point.id
                )));
            }
            if point.dimensions() != dimensions {
                return Err(Error::invalid_input(format!(
                    "Point {} ({}): vector has {} dimensions, expected {}",
                    i + 1,
                    point.id,
                    point.dimensions(),
                    dimensions
                )));
            }
        }

        Ok(Self { points, dimensions })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Result of an archive upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    /// Collection was created by this run
    pub created: bool,
    pub points: usize,
    pub batches: usize,
}

/// Upserts an archive in fixed-size batches, in order
pub struct BatchUploader {
    store: Arc<dyn VectorStoreProvider>,
    batch_size: usize,
    show_progress: bool,
}

impl BatchUploader {
    pub fn new(store: Arc<dyn VectorStoreProvider>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::invalid_input("Batch size must be at least 1"));
        }
        Ok(Self {
            store,
            batch_size,
            show_progress: false,
        })
    }

    /// Draw a progress bar on stderr
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Create the collection if absent and upsert every point
    ///
    /// Stops at the first failing batch; earlier batches stay written.
    pub async fn upload(&self, collection: &str, archive: &PointsArchive) -> Result<UploadSummary> {
        let created = self
            .store
            .ensure_collection(collection, archive.dimensions())
            .await?;
        if created {
            tracing::info!("Collection {} created", collection);
        } else {
            tracing::info!("Collection {} already exists", collection);
        }

        let progress = self.progress_bar(archive.len() as u64);
        let mut uploaded = 0usize;
        let mut batches = 0usize;

        for batch in archive.points().chunks(self.batch_size) {
            if let Err(e) = self.store.upsert(collection, batch).await {
                progress.abandon_with_message(format!("failed after {} points", uploaded));
                tracing::error!(
                    "Batch {} failed after {}/{} points: {}",
                    batches + 1,
                    uploaded,
                    archive.len(),
                    e
                );
                return Err(e);
            }
            uploaded += batch.len();
            batches += 1;
            progress.inc(batch.len() as u64);
            tracing::debug!("Uploaded: {}/{}", uploaded, archive.len());
        }

        progress.finish_with_message("done");
        tracing::info!(
            "Uploaded {} points to {} in {} batches",
            uploaded,
            collection,
            batches
        );

        Ok(UploadSummary {
            created,
            points: uploaded,
            batches,
        })
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} points {msg}",
        ) {
            bar.set_style(style);
        }
        bar
    }
}
