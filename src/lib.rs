//! Churn Preview Library
//!
//! Incrementally loads churn prediction results from the prediction service
//! for a selected spreadsheet file and sheet, page by page, in browse or
//! search mode. Responses from superseded selections are discarded, and the
//! next page is requested only when the end-of-list sentinel becomes visible.

pub mod constants;
pub mod domain;
pub mod error;
pub mod eventing;
pub mod features;
pub mod helpers;
pub mod services;
pub mod state;
