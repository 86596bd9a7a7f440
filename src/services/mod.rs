//! Service Layer
//!
//! Abstraction over the remote prediction service and the async runtime the
//! loader runs its fetches on.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   PredictionsApi                      │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────┐  │
//! │  │ browse/search│  │   catalog    │  │   export   │  │
//! │  │    pages     │  │ files/sheets │  │  download  │  │
//! │  └──────────────┘  └──────────────┘  └────────────┘  │
//! └──────────────────────────────────────────────────────┘
//!              │ PageSource
//!              ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                  LoaderController                     │
//! └──────────────────────────────────────────────────────┘
//! ```

mod api;
mod runtime;
mod source;

pub use api::*;
pub use runtime::*;
pub use source::*;
