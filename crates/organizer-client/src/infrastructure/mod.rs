//! Infrastructure layer: HTTP adapter, capture seam, and configuration storage.

pub mod api;
pub mod capture;
pub mod storage;
