//! # stencil-renderer
//!
//! Tera-based engine that renders one template per source unit and decides
//! the default output name for each.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use stencil_core::{SourceUnit, TemplateSettings};
//! use stencil_renderer::TemplateEngine;
//!
//! fn render_one(root: &Path) {
//!     let template = root.join("templates").join("models.tera");
//!     if let Ok(engine) = TemplateEngine::load(root, &template, TemplateSettings::default()) {
//!         let unit = SourceUnit::new(root.join("src").join("Customer.cs"));
//!         if let Ok(Some(text)) = engine.render(&unit) {
//!             println!("{} bytes", text.len());
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::SourceContext;
pub use engine::TemplateEngine;
pub use error::RenderError;
