//! Scroll Sentinel
//!
//! Watches the end-of-list marker and turns "marker visible" into a single
//! load-more signal. The root is the scroll viewport grown by the configured
//! margin, so the signal fires before the user reaches the literal bottom.
//! After firing, the sentinel stays quiet until the view re-arms it on its
//! next render.

use crate::domain::SentinelConfig;
use crate::state::LoaderState;

/// Positions in content coordinates (pixels from the top of the list)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentinelGeometry {
    /// Scroll offset of the viewport
    pub viewport_top: f32,
    pub viewport_height: f32,
    /// Top of the end-of-list marker
    pub marker_top: f32,
    pub marker_height: f32,
}

impl SentinelGeometry {
    /// Marker placed directly after `rows` rows of `row_height` pixels
    pub fn after_rows(
        rows: usize,
        row_height: f32,
        viewport_top: f32,
        viewport_height: f32,
    ) -> Self {
        Self {
            viewport_top,
            viewport_height,
            marker_top: rows as f32 * row_height,
            marker_height: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrollSentinel {
    config: SentinelConfig,
    armed: bool,
}

impl ScrollSentinel {
    pub fn new(config: SentinelConfig) -> Self {
        Self {
            config: SentinelConfig {
                root_margin_px: config.root_margin_px.max(0.0),
                threshold: config.threshold.clamp(0.0, 1.0),
            },
            armed: true,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Re-observe the (possibly moved) marker; call after every render
    pub fn rearm(&mut self) {
        self.armed = true;
    }

    /// Visible fraction of the marker inside the margin-extended viewport
    pub fn intersection_ratio(&self, geometry: &SentinelGeometry) -> f32 {
        let margin = self.config.root_margin_px;
        let root_top = geometry.viewport_top - margin;
        let root_bottom = geometry.viewport_top + geometry.viewport_height.max(0.0) + margin;

        let marker_top = geometry.marker_top;
        let marker_height = geometry.marker_height.max(0.0);
        if marker_height == 0.0 {
            return if marker_top >= root_top && marker_top <= root_bottom {
                1.0
            } else {
                0.0
            };
        }

        let overlap = (marker_top + marker_height).min(root_bottom) - marker_top.max(root_top);
        (overlap / marker_height).clamp(0.0, 1.0)
    }

    pub fn is_intersecting(&self, geometry: &SentinelGeometry) -> bool {
        let ratio = self.intersection_ratio(geometry);
        ratio > 0.0 && ratio >= self.config.threshold
    }

    /// Returns true when the loader should be asked for the next page
    ///
    /// Never fires while the loader is busy or has nothing more to load, and
    /// fires at most once per arming.
    pub fn observe(&mut self, geometry: &SentinelGeometry, state: &LoaderState) -> bool {
        if !self.armed || !state.can_request_more() {
            return false;
        }
        if !self.is_intersecting(geometry) {
            return false;
        }
        self.armed = false;
        tracing::debug!(
            page = state.current_page(),
            total = state.total_pages(),
            "Sentinel visible, requesting next page"
        );
        true
    }
}

impl Default for ScrollSentinel {
    fn default() -> Self {
        Self::new(SentinelConfig::default())
    }
}
