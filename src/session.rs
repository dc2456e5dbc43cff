//! Highlight session: region selection, geometry lifecycle, rotation gating.
//!
//! A session owns the pipeline, the cache and the currently highlighted
//! region for one globe instance. Highlighting a region detaches the previous
//! geometry first, resolves the new artifact set through the cache, starts a
//! rotation toward the region's center, and attaches the geometry either
//! immediately (precomputed, large regions) or once the rotation completes.
//!
//! A highlight superseded mid-flight is not an error: its result is detected
//! as stale against the current selection and discarded.

use crate::cache::{CacheError, CacheKey, MeshCacheSystem, TierOrigin};
use crate::centers::CenterTable;
use crate::config::GlobeConfig;
use crate::geometry::{LngLat, Style, TessellationMethod};
use crate::mesh::MeshArtifactSet;
use crate::pipeline::MeshPipeline;
use crate::rotation::{ActiveRotation, RotationController};
use crate::source::RegionSource;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Rendering collaborator. Artifact sets are attached and detached by region
/// code; the sink tracks whatever scene objects it creates for them.
pub trait SceneSink: Send + Sync + 'static {
    fn attach(&self, code: &str, set: Arc<MeshArtifactSet>);
    fn detach(&self, code: &str);
}

#[derive(Debug, Error)]
pub enum HighlightError {
    /// The center table has no target coordinate; the request is aborted and
    /// the current display left untouched
    #[error("no center coordinate for region {0}")]
    MissingCenter(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Result of a highlight request.
#[derive(Debug)]
pub enum HighlightOutcome {
    /// Geometry attached immediately; rotation runs concurrently
    Attached {
        origin: TierOrigin,
        rotation: ActiveRotation,
    },
    /// Geometry will attach when the rotation completes; the caller drives
    /// the rotation from its frame loop
    PendingRotation {
        origin: TierOrigin,
        rotation: ActiveRotation,
    },
    /// Another region was selected while this one was computing
    Stale,
}

struct Selection {
    current: Option<String>,
    focus: LngLat,
}

/// One globe's highlight state.
pub struct HighlightSession<S, K> {
    pipeline: MeshPipeline,
    cache: Arc<MeshCacheSystem>,
    source: Arc<S>,
    sink: Arc<K>,
    centers: CenterTable,
    rotation: RotationController,
    selection: Arc<Mutex<Selection>>,
}

impl<S, K> HighlightSession<S, K>
where
    S: RegionSource + 'static,
    K: SceneSink,
{
    pub fn new(config: &GlobeConfig, source: Arc<S>, sink: Arc<K>, centers: CenterTable) -> Self {
        info!(
            radius = config.radius,
            source = source.name(),
            centers = centers.len(),
            "highlight session created"
        );
        Self {
            pipeline: MeshPipeline::new(config),
            cache: Arc::new(MeshCacheSystem::new(&config.cache)),
            source,
            sink,
            centers,
            rotation: RotationController::new(config.rotation_duration),
            selection: Arc::new(Mutex::new(Selection {
                current: None,
                focus: LngLat::new(0.0, 0.0),
            })),
        }
    }

    /// Highlight a region with automatic tessellation selection.
    pub async fn highlight(
        &self,
        code: &str,
        style: Style,
    ) -> Result<HighlightOutcome, HighlightError> {
        self.highlight_with_method(code, style, TessellationMethod::Auto)
            .await
    }

    /// Highlight a region, forcing a tessellation method.
    pub async fn highlight_with_method(
        &self,
        code: &str,
        style: Style,
        method: TessellationMethod,
    ) -> Result<HighlightOutcome, HighlightError> {
        let code = code.to_ascii_uppercase();

        let Some(center) = self.centers.get(&code) else {
            warn!(code = %code, "no center coordinate, aborting highlight");
            return Err(HighlightError::MissingCenter(code));
        };

        // Detach the previous region before any lookup or compute, so stale
        // artifacts never linger next to new ones.
        let (previous, focus) = {
            let mut selection = self
                .selection
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            (selection.current.replace(code.clone()), selection.focus)
        };
        if let Some(previous) = previous {
            debug!(code = %previous, "detaching previous region");
            self.sink.detach(&previous);
        }

        let key = CacheKey::new(&code, style, self.pipeline.radius(), method);
        let lookup = {
            let model_source = Arc::clone(&self.source);
            let model_code = code.clone();
            let compute_source = Arc::clone(&self.source);
            let compute_code = code.clone();
            let pipeline = self.pipeline.clone();

            self.cache
                .get_or_compute(
                    key,
                    move || async move {
                        model_source
                            .fetch_model(&model_code)
                            .await
                            .map_err(|e| e.to_string())
                    },
                    move || async move {
                        let document = compute_source
                            .fetch_region(&compute_code)
                            .await
                            .map_err(|e| e.to_string())?;
                        pipeline
                            .build_artifacts(&compute_code, &document, style, method)
                            .map_err(|e| e.to_string())
                    },
                )
                .await?
        };

        if !self.is_current(&code) {
            debug!(code = %code, "highlight superseded, discarding result");
            return Ok(HighlightOutcome::Stale);
        }

        let rotation = self.rotation.begin(focus, center);
        {
            let mut selection = self
                .selection
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            selection.focus = center;
        }

        // Precomputed regions are large enough that waiting for the rotation
        // adds perceptible latency; overlay them immediately.
        if self.cache.is_precomputed(&code) {
            self.sink.attach(&code, Arc::clone(&lookup.set));
            debug!(code = %code, origin = ?lookup.origin, "attached immediately");
            return Ok(HighlightOutcome::Attached {
                origin: lookup.origin,
                rotation,
            });
        }

        self.attach_after_rotation(&rotation, code.clone(), Arc::clone(&lookup.set));
        Ok(HighlightOutcome::PendingRotation {
            origin: lookup.origin,
            rotation,
        })
    }

    /// Detach whatever is currently highlighted.
    pub fn clear(&self) {
        let previous = {
            let mut selection = self
                .selection
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            selection.current.take()
        };
        if let Some(previous) = previous {
            self.sink.detach(&previous);
        }
    }

    pub fn current(&self) -> Option<String> {
        self.selection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .current
            .clone()
    }

    pub fn cache(&self) -> &MeshCacheSystem {
        &self.cache
    }

    fn is_current(&self, code: &str) -> bool {
        self.selection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .current
            .as_deref()
            == Some(code)
    }

    /// Attach once the rotation signals completion, unless the selection
    /// moved on in the meantime. A rotation dropped before completing closes
    /// the channel and the attach is skipped, which is the stale case.
    fn attach_after_rotation(
        &self,
        rotation: &ActiveRotation,
        code: String,
        set: Arc<MeshArtifactSet>,
    ) {
        let mut rx = rotation.subscribe();
        let sink = Arc::clone(&self.sink);
        let selection = Arc::clone(&self.selection);

        tokio::spawn(async move {
            while !*rx.borrow_and_update() {
                if rx.changed().await.is_err() {
                    debug!(code = %code, "rotation abandoned before completion");
                    return;
                }
            }

            let still_current = selection
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .current
                .as_deref()
                == Some(code.as_str());
            if still_current {
                debug!(code = %code, "rotation complete, attaching");
                sink.attach(&code, set);
            } else {
                debug!(code = %code, "selection changed during rotation, discarding");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::RegionDocument;
    use crate::source::SourceError;
    use std::time::Duration;

    const SQUARE_DOC: &str = r#"{
        "features": [{
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
            }
        }]
    }"#;

    struct StaticSource;

    impl RegionSource for StaticSource {
        async fn fetch_region(&self, code: &str) -> Result<RegionDocument, SourceError> {
            if code == "BAD" {
                return Err(SourceError::NotFound(code.to_string()));
            }
            RegionDocument::from_json(SQUARE_DOC)
                .map_err(|e| SourceError::InvalidDocument(e.to_string()))
        }

        async fn fetch_model(&self, code: &str) -> Result<Vec<u8>, SourceError> {
            Err(SourceError::NotFound(code.to_string()))
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl SceneSink for RecordingSink {
        fn attach(&self, code: &str, _set: Arc<MeshArtifactSet>) {
            self.events.lock().unwrap().push(format!("attach:{code}"));
        }

        fn detach(&self, code: &str) {
            self.events.lock().unwrap().push(format!("detach:{code}"));
        }
    }

    fn centers() -> CenterTable {
        CenterTable::from_json(br#"{"DEU": [51.0, 9.0], "FRA": [46.0, 2.0], "BAD": [0.0, 0.0]}"#)
            .unwrap()
    }

    fn session(rotation: Duration) -> HighlightSession<StaticSource, RecordingSink> {
        let config = GlobeConfig::default().with_rotation_duration(rotation);
        HighlightSession::new(
            &config,
            Arc::new(StaticSource),
            Arc::new(RecordingSink::default()),
            centers(),
        )
    }

    #[tokio::test]
    async fn test_highlight_attaches_after_rotation() {
        let session = session(Duration::ZERO);
        let outcome = session.highlight("deu", Style::Filled).await.unwrap();

        let HighlightOutcome::PendingRotation { mut rotation, .. } = outcome else {
            panic!("expected rotation-gated attach");
        };
        rotation.advance(Duration::ZERO);
        assert!(rotation.is_complete());

        // Let the gate task run.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(session.sink.events(), vec!["attach:DEU"]);
        assert_eq!(session.current().as_deref(), Some("DEU"));
    }

    #[tokio::test]
    async fn test_previous_region_detached_before_next_attach() {
        let session = session(Duration::ZERO);

        let HighlightOutcome::PendingRotation { mut rotation, .. } =
            session.highlight("DEU", Style::Filled).await.unwrap()
        else {
            panic!("expected rotation-gated attach");
        };
        rotation.advance(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let HighlightOutcome::PendingRotation { mut rotation, .. } =
            session.highlight("FRA", Style::Filled).await.unwrap()
        else {
            panic!("expected rotation-gated attach");
        };
        rotation.advance(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(
            session.sink.events(),
            vec!["attach:DEU", "detach:DEU", "attach:FRA"]
        );
    }

    #[tokio::test]
    async fn test_missing_center_aborts_without_touching_display() {
        let session = session(Duration::ZERO);

        let HighlightOutcome::PendingRotation { mut rotation, .. } =
            session.highlight("DEU", Style::Filled).await.unwrap()
        else {
            panic!("expected rotation-gated attach");
        };
        rotation.advance(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = session.highlight("ATL", Style::Filled).await.unwrap_err();
        assert!(matches!(err, HighlightError::MissingCenter(_)));

        // DEU stays attached and selected.
        assert_eq!(session.sink.events(), vec!["attach:DEU"]);
        assert_eq!(session.current().as_deref(), Some("DEU"));
    }

    #[tokio::test]
    async fn test_abandoned_rotation_never_attaches() {
        let session = session(Duration::from_secs(10));

        let outcome = session.highlight("DEU", Style::Filled).await.unwrap();
        // Drop the rotation without ever completing it.
        drop(outcome);

        // Select something else.
        let HighlightOutcome::PendingRotation { mut rotation, .. } =
            session.highlight("FRA", Style::Filled).await.unwrap()
        else {
            panic!("expected rotation-gated attach");
        };
        rotation.advance(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let events = session.sink.events();
        assert!(!events.contains(&"attach:DEU".to_string()), "{events:?}");
        assert_eq!(events.last().map(String::as_str), Some("attach:FRA"));
    }

    #[tokio::test]
    async fn test_failed_source_propagates_and_leaves_no_geometry() {
        let session = session(Duration::ZERO);
        let err = session.highlight("BAD", Style::Filled).await.unwrap_err();
        assert!(matches!(err, HighlightError::Cache(CacheError::Compute(_))));
        assert!(session.sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_second_highlight_hits_cache() {
        let session = session(Duration::ZERO);

        let HighlightOutcome::PendingRotation { origin, mut rotation } =
            session.highlight("DEU", Style::Filled).await.unwrap()
        else {
            panic!("expected rotation-gated attach");
        };
        assert_eq!(origin, TierOrigin::Computed);
        rotation.advance(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Re-highlighting the same region after another is served from
        // memory.
        session.highlight("FRA", Style::Filled).await.unwrap();
        let HighlightOutcome::PendingRotation { origin, .. } =
            session.highlight("DEU", Style::Filled).await.unwrap()
        else {
            panic!("expected rotation-gated attach");
        };
        assert_eq!(origin, TierOrigin::Memory);
    }

    #[tokio::test]
    async fn test_styles_cached_separately() {
        let session = session(Duration::ZERO);

        session.highlight("DEU", Style::Filled).await.unwrap();
        let HighlightOutcome::PendingRotation { origin, .. } =
            session.highlight("DEU", Style::Outline).await.unwrap()
        else {
            panic!("expected rotation-gated attach");
        };
        // The outline request must not reuse the filled artifact.
        assert_eq!(origin, TierOrigin::Computed);
    }

    #[tokio::test]
    async fn test_clear_detaches_current() {
        let session = session(Duration::ZERO);
        let HighlightOutcome::PendingRotation { mut rotation, .. } =
            session.highlight("DEU", Style::Filled).await.unwrap()
        else {
            panic!("expected rotation-gated attach");
        };
        rotation.advance(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(20)).await;

        session.clear();
        assert_eq!(session.sink.events(), vec!["attach:DEU", "detach:DEU"]);
        assert!(session.current().is_none());
    }
}
