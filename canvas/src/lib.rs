//! Annotation and viewport engine for the visual QA comparison canvas.
//!
//! The crate is compiled to WebAssembly for the browser and as a plain rlib for
//! the command-line host. It owns the interactive half of the tool: mapping
//! pointer events through the pan/zoom viewport into percentage coordinates on
//! the dev screenshot, running the per-tool gesture state machine, mutating the
//! project/issue/annotation document, and keeping the snapshot undo stack. The
//! host layer only wires DOM events in and reacts to the returned
//! [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`doc`] | Projects, dev images, annotations and issues |
//! | [`history`] | Bounded snapshot undo stack |
//! | [`camera`] | Viewport camera and model/screen coordinate mapping |
//! | [`input`] | Tools, modifier keys, and the gesture state machine |
//! | [`hit`] | Hit-testing pointer positions against annotations |
//! | [`sampler`] | Pixel sampling and magnifier for the color picker |
//! | [`ingest`] | Vision-model findings and the analysis lifecycle |
//! | [`render`] | Overlay rendering onto a 2D canvas |
//! | [`consts`] | Shared numeric constants (zoom limits, thresholds, etc.) |

pub mod camera;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod history;
pub mod hit;
pub mod ingest;
pub mod input;
pub mod render;
pub mod sampler;
