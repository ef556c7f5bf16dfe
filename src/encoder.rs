//! Analysis record encoding
//!
//! This module wraps a finished [`VideoAnalysis`] into a self-describing
//! record that a persistence collaborator can store as an opaque document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AnalysisError;
use crate::types::VideoAnalysis;
use crate::{PRODUCER_NAME, VERSION};

/// Current analysis record version
pub const RECORD_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Persistable form of one video analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub record_version: String,
    pub producer: RecordProducer,
    pub computed_at_utc: DateTime<Utc>,
    /// Closeness threshold the interactions were derived with
    pub closeness_threshold: f64,
    pub analysis: VideoAnalysis,
}

/// Encoder for analysis records
pub struct AnalysisEncoder {
    instance_id: String,
}

impl Default for AnalysisEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(&self, analysis: &VideoAnalysis) -> AnalysisRecord {
        AnalysisRecord {
            record_version: RECORD_VERSION.to_string(),
            producer: RecordProducer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now(),
            closeness_threshold: analysis.threshold().value(),
            analysis: analysis.clone(),
        }
    }

    /// Encode to a JSON string
    pub fn encode_to_json(
        &self,
        analysis: &VideoAnalysis,
        pretty: bool,
    ) -> Result<String, AnalysisError> {
        let record = self.encode(analysis);
        let json = if pretty {
            serde_json::to_string_pretty(&record)?
        } else {
            serde_json::to_string(&record)?
        };
        Ok(json)
    }

    /// Read a record back, rejecting records of another version
    ///
    /// The embedded analysis is checked for consistency while it is read, and
    /// the record threshold must be the one the analysis was derived with.
    pub fn decode_json(json: &str) -> Result<AnalysisRecord, AnalysisError> {
        let record: AnalysisRecord = serde_json::from_str(json)?;
        if record.record_version != RECORD_VERSION {
            return Err(AnalysisError::ParseError(format!(
                "Unsupported record version {}",
                record.record_version
            )));
        }
        if record.closeness_threshold != record.analysis.threshold().value() {
            return Err(AnalysisError::InconsistentAnalysis(format!(
                "record threshold {} differs from analysis threshold {}",
                record.closeness_threshold,
                record.analysis.threshold().value()
            )));
        }
        Ok(record)
    }
}

impl AnalysisRecord {
    /// The analysis, ready to be shared with readers
    pub fn into_shared(self) -> Arc<VideoAnalysis> {
        Arc::new(self.analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::detection::RawDetection;
    use crate::pipeline::analyze_trace;
    use crate::trace::DetectionTrace;
    use crate::types::ActorPair;
    use pretty_assertions::assert_eq;

    fn sample_analysis() -> Arc<VideoAnalysis> {
        let row = |class_id, x| RawDetection {
            x,
            y: 0.5,
            w: 0.3,
            h: 0.3,
            confidence: 0.9,
            class_id,
        };
        let frames = vec![
            vec![row(0, 0.5), row(1, 0.5)],
            vec![row(0, 0.5), row(1, 0.5)],
            vec![row(0, 0.1), row(1, 0.9)],
        ];
        let trace = DetectionTrace::new("videos/session-07.mp4", 30.0, frames);
        analyze_trace(&trace, &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_record_layout() {
        let encoder = AnalysisEncoder::with_instance_id("test-instance".to_string());
        let json = encoder.encode_to_json(&sample_analysis(), false).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["record_version"], "1.0.0");
        assert_eq!(payload["producer"]["name"], "therapy-interactions");
        assert_eq!(payload["producer"]["instance_id"], "test-instance");
        assert_eq!(payload["closeness_threshold"], 0.6);

        let analysis = &payload["analysis"];
        assert_eq!(analysis["source_id"], "videos/session-07.mp4");
        assert_eq!(
            analysis["interactions"]["child_caretaker"],
            serde_json::json!([true, true, false])
        );
        assert_eq!(
            analysis["closeness"]["child_device"],
            serde_json::json!([null, null, null])
        );
        assert_eq!(analysis["statistics"]["child_caretaker"]["n_interactions"], 1);
        assert!(analysis["statistics"]["child_device"]["mean_time"].is_null());
    }

    #[test]
    fn test_decode_round_trip() {
        let analysis = sample_analysis();
        let encoder = AnalysisEncoder::new();
        let json = encoder.encode_to_json(&analysis, true).unwrap();

        let record = AnalysisEncoder::decode_json(&json).unwrap();
        let restored = record.into_shared();
        assert_eq!(*restored, *analysis);
        assert_eq!(
            restored.statistics(ActorPair::ChildCaretaker),
            analysis.statistics(ActorPair::ChildCaretaker)
        );
    }

    #[test]
    fn test_unique_instance_ids() {
        let a = AnalysisEncoder::new().encode(&sample_analysis());
        let b = AnalysisEncoder::new().encode(&sample_analysis());
        assert_ne!(a.producer.instance_id, b.producer.instance_id);
    }

    #[test]
    fn test_decode_rejects_other_versions() {
        let encoder = AnalysisEncoder::new();
        let json = encoder.encode_to_json(&sample_analysis(), false).unwrap();
        let json = json.replace("\"record_version\":\"1.0.0\"", "\"record_version\":\"9.9.9\"");

        assert!(matches!(
            AnalysisEncoder::decode_json(&json),
            Err(AnalysisError::ParseError(_))
        ));
        assert!(matches!(
            AnalysisEncoder::decode_json("[]"),
            Err(AnalysisError::JsonError(_))
        ));
    }

    #[test]
    fn test_record_threshold_comes_from_analysis() {
        let row = |class_id| RawDetection {
            x: 0.5,
            y: 0.5,
            w: 0.3,
            h: 0.3,
            confidence: 0.9,
            class_id,
        };
        let trace = DetectionTrace::new("loose.mp4", 30.0, vec![vec![row(0), row(1)]]);
        let config = AnalysisConfig {
            closeness_threshold: 0.1,
            ..Default::default()
        };
        let analysis = analyze_trace(&trace, &config).unwrap();

        let record = AnalysisEncoder::new().encode(&analysis);
        assert_eq!(record.closeness_threshold, 0.1);
        assert_eq!(record.analysis.threshold().value(), 0.1);
    }

    #[test]
    fn test_decode_rejects_tampered_threshold() {
        let json = AnalysisEncoder::new()
            .encode_to_json(&sample_analysis(), false)
            .unwrap();
        let mut payload: serde_json::Value = serde_json::from_str(&json).unwrap();
        payload["closeness_threshold"] = serde_json::json!(7.0);

        let result = AnalysisEncoder::decode_json(&payload.to_string());
        assert!(matches!(
            result,
            Err(AnalysisError::InconsistentAnalysis(_))
        ));
    }

    #[test]
    fn test_decode_rejects_inconsistent_analysis() {
        let json = AnalysisEncoder::new()
            .encode_to_json(&sample_analysis(), false)
            .unwrap();
        let original: serde_json::Value = serde_json::from_str(&json).unwrap();

        let mut zero_fps = original.clone();
        zero_fps["analysis"]["fps"] = serde_json::json!(0.0);

        let mut ragged = original.clone();
        ragged["analysis"]["interactions"]["child_device"] = serde_json::json!([false]);

        let mut flipped = original.clone();
        flipped["analysis"]["interactions"]["child_caretaker"] =
            serde_json::json!([true, true, true]);

        let mut wrong_stats = original;
        wrong_stats["analysis"]["statistics"]["child_caretaker"]["n_interactions"] =
            serde_json::json!(0);

        for tampered in [zero_fps, ragged, flipped, wrong_stats] {
            let result = AnalysisEncoder::decode_json(&tampered.to_string());
            assert!(
                matches!(result, Err(AnalysisError::JsonError(_))),
                "accepted {}",
                tampered["analysis"]
            );
        }
    }
}
