//! Result types of one conversion and their JSON envelopes.

use crate::error::VectorizeError;
use crate::geometry::Bounds;
use crate::timer::TimingRecord;
use serde::Serialize;
use serde_json::{json, Value};

/// Dimensions and extent of a persisted conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    pub bounds: Bounds,
    pub image_width: u32,
    pub image_height: u32,
}

/// A successful conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Vectorized {
    /// Markup persisted under `object_id`.
    Stored { object_id: String, info: ImageInfo },
    /// Markup returned inline (`raw` requests).
    Markup(String),
}

pub type PipelineOutcome = Result<Vectorized, VectorizeError>;

/// Outcome plus the stage timings collected while producing it.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: PipelineOutcome,
    pub timings: Vec<TimingRecord>,
}

#[derive(Serialize)]
struct StoredEnvelope<'a> {
    success: bool,
    #[serde(rename = "objectId")]
    object_id: &'a str,
    info: &'a ImageInfo,
}

/// `{"success": true, "objectId": .., "info": ..}` for stored results.
///
/// Returns `None` for inline markup, which is not wrapped in JSON.
pub fn success_envelope(result: &Vectorized) -> Option<Value> {
    match result {
        Vectorized::Stored { object_id, info } => serde_json::to_value(StoredEnvelope {
            success: true,
            object_id,
            info,
        })
        .ok(),
        Vectorized::Markup(_) => None,
    }
}

/// `{"success": false, "error": <public message>}`.
pub fn failure_envelope(error: &VectorizeError) -> Value {
    json!({
        "success": false,
        "error": error.public_message(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_envelope_shape() {
        let v = success_envelope(&Vectorized::Stored {
            object_id: "abc".into(),
            info: ImageInfo {
                bounds: Bounds {
                    x: 1.0,
                    y: 2.0,
                    width: 3.0,
                    height: 4.0,
                },
                image_width: 10,
                image_height: 20,
            },
        })
        .unwrap();
        assert_eq!(
            v,
            json!({
                "success": true,
                "objectId": "abc",
                "info": {
                    "bounds": {"x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0},
                    "image_width": 10,
                    "image_height": 20
                }
            })
        );
    }

    #[test]
    fn markup_has_no_envelope() {
        assert!(success_envelope(&Vectorized::Markup("<svg/>".into())).is_none());
    }

    #[test]
    fn failure_envelope_uses_public_message() {
        let err = VectorizeError::PathRead {
            path: "/etc/secret".into(),
            detail: "denied".into(),
        };
        let v = failure_envelope(&err);
        assert_eq!(
            v,
            json!({"success": false, "error": "Failed to read image from provided path."})
        );
        assert!(!v.to_string().contains("secret"));
    }
}
