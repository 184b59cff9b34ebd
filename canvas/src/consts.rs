//! Shared numeric constants for the canvas crate.

// ── Viewport ────────────────────────────────────────────────────

/// Multiplicative step applied by one zoom-in / zoom-out.
pub const ZOOM_STEP: f64 = 1.2;

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 5.0;

/// Zoom restored by the global reset shortcut.
pub const DEFAULT_ZOOM: f64 = 1.0;

/// Zoom the standalone report viewer resets to.
pub const REPORT_DEFAULT_ZOOM: f64 = 0.4;

/// Zoom applied when framing an annotation selected from the issue list.
pub const FOCUS_ZOOM: f64 = 1.5;

// ── Gestures (percentage units) ─────────────────────────────────

/// A pointer drag longer than this creates a box instead of a pin.
pub const BOX_DRAG_THRESHOLD_PCT: f64 = 0.5;

/// A ruler drag must exceed this length to commit a measurement.
pub const RULER_MIN_LENGTH_PCT: f64 = 0.1;

/// Floor for annotation width/height while resizing.
pub const MIN_BOX_SIZE_PCT: f64 = 0.5;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for handles, pins and endpoints.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

// ── History ─────────────────────────────────────────────────────

/// Number of undo snapshots retained.
pub const HISTORY_CAPACITY: usize = 20;

// ── Color sampler ───────────────────────────────────────────────

/// Side length, in source pixels, of the magnifier patch.
pub const MAGNIFIER_PATCH_PX: u32 = 10;

/// Side length, in screen pixels, of the rendered magnifier preview.
pub const MAGNIFIER_PREVIEW_PX: f64 = 100.0;

/// Largest decoded image the sampler accepts, in pixels (a 16384x16384 canvas).
pub const MAX_IMAGE_PIXELS: u64 = 16_384 * 16_384;

// ── Analysis ────────────────────────────────────────────────────

/// Scale of the vision model's bounding-box grid (0–1000).
pub const FINDING_GRID_MAX: f64 = 1000.0;

/// Progress ceiling the indeterminate analysis bar approaches but never reaches.
pub const ANALYSIS_PROGRESS_CEILING: f64 = 95.0;

/// Delay between the progress bar reaching 100% and committing findings.
pub const ANALYSIS_COMMIT_DELAY_MS: u32 = 500;
