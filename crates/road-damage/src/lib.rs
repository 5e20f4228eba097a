//! Road Damage Reports
//!
//! Provider-independent pieces of the detection pipeline:
//! - Detection Report model and severity ordering
//! - Image payload normalization (data-URL stripping, media type sniffing)
//! - Coercion of loosely formatted provider replies into JSON

mod coerce;
mod error;
mod lenient;
mod payload;
mod report;

pub use coerce::{parse_reply, strip_code_fences, truncate_raw, RAW_PREVIEW_CHARS};
pub use error::ReplyError;
pub use payload::{ImagePayload, MediaType};
pub use report::{
    sort_by_severity, Analysis, Detection, DetectionReport, RiskLevel, RoadCondition, RoadType,
    Severity, Verification,
};
