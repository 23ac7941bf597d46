//! Client for the external diagram engine's HTTP API.
//!
//! - [`client`]: untyped JSON requests, response normalisation, `enc_id`
//! - [`timing`]: typed timing diagram endpoints
//! - [`types`]: entities, request bodies and the model→view index

pub mod client;
pub mod error;
pub mod timing;
pub mod types;

pub use client::{enc_id, normalize_body, ApiClient, ApiResponse};
pub use error::{ApiError, ApiResult};
pub use timing::TimingApi;
pub use types::{Bounds, Element, ElementKind, ExportedImage, View, ViewIndex};
