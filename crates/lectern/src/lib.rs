//! Lectern - document ingestion for reading-assistance tools
//!
//! Lectern turns whatever a reader brings (typed text, a text file, a PDF, a
//! Word document, or a photographed or pasted page) into one plain-text
//! string that downstream tools can reformat, summarize, translate or read
//! aloud.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lectern::{InputDocument, LecternConfig, Orchestrator};
//!
//! # #[tokio::main]
//! # async fn main() -> lectern::Result<()> {
//! let config = LecternConfig::load(None)?;
//! let orchestrator = Orchestrator::from_config(&config);
//!
//! let bytes = std::fs::read("chapter.pdf")?;
//! let result = orchestrator.extract(InputDocument::upload("chapter.pdf", bytes)).await;
//! println!("{:?}: {}", result.status, result.text);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core** (`core`): suffix routing, the dispatch orchestrator, config loading
//! - **Adapters** (`adapters`): plain text, PDF, Word and image sources
//! - **Preprocessing** (`preprocess`): downscale, grayscale and JPEG re-encode before OCR
//! - **OCR** (`ocr`): the gateway trait and its HTTP clients
//! - **Session** (`session`): last-submission-wins text state for callers
//! - **API** (`api`, feature `api`): the HTTP relay

#![deny(unsafe_code)]

pub mod adapters;
pub mod core;
pub mod error;
pub mod ocr;
pub mod preprocess;
pub mod session;
pub mod types;

#[cfg(feature = "api")]
pub mod api;

pub use error::{LecternError, Result};
pub use types::*;

pub use core::config::LecternConfig;
pub use core::orchestrator::{Orchestrator, Submitted};
pub use core::routing::{format_for_file_name, route};
pub use ocr::{HttpOcrGateway, OcrGateway, OcrSpaceClient};
pub use preprocess::{PreprocessOptions, preprocess, preprocess_data_url};
pub use session::{Applied, ExtractionSession, Ticket};
