//! HTTP protocol layer module
//!
//! Response builders shared by the API handlers, decoupled from the
//! upstream call logic.

pub mod response;

// Re-export commonly used builders
pub use response::{
    build_404_response, build_405_response, build_413_response, build_detail_response,
    build_json_response,
};
