use std::time::Duration;

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{
    Env,
    error::{ModelError, ModelResult},
};

/// One step of the nested work a run-once performs inside its container.
///
/// Wire form is an adjacently tagged object: `{"action": <tag>, "args": {…}}`
/// with lowercase tags. Decoding is strict about the tag and the required
/// args; unknown fields inside `args` are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(tag = "action", content = "args", rename_all = "snake_case")]
pub enum ExecutorAction {
    Download(DownloadArgs),
    Upload(UploadArgs),
    Run(RunArgs),
    FetchResult(FetchResultArgs),
}

impl ExecutorAction {
    /// Decode a single action payload.
    ///
    /// Any malformed payload (unknown tag, missing required args, wrong
    /// shape) collapses to [`ModelError::InvalidActionConversion`].
    pub fn from_json(payload: &str) -> ModelResult<Self> {
        serde_json::from_str(payload).map_err(|_| ModelError::InvalidActionConversion)
    }

    pub fn to_json(&self) -> ModelResult<String> {
        serde_json::to_string(self).map_err(|_| ModelError::InvalidActionConversion)
    }

    /// The lowercase wire tag.
    pub fn tag(&self) -> &'static str {
        match self {
            ExecutorAction::Download(_) => "download",
            ExecutorAction::Upload(_) => "upload",
            ExecutorAction::Run(_) => "run",
            ExecutorAction::FetchResult(_) => "fetch_result",
        }
    }
}

/// Fetch a blob from `from`, optionally unarchive it, place it at `to`
/// inside the container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct DownloadArgs {
    pub from: String,
    pub to: String,
    pub extract: bool,
}

/// Copy the in-container path `from` out and PUT it to the `to` URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct UploadArgs {
    pub from: String,
    pub to: String,
}

/// Execute `script` inside the container.
///
/// `timeout` travels as integer nanoseconds; zero means no timeout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct RunArgs {
    pub script: String,
    #[serde(with = "duration_nanos")]
    #[cfg_attr(feature = "schema", schemars(with = "u64"))]
    pub timeout: Duration,
    pub env: Env,
}

/// Read the container file at `file` into the task's result slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct FetchResultArgs {
    pub file: String,
}

mod duration_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_nanos() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let nanos = u64::deserialize(d)?;
        Ok(Duration::from_nanos(nanos))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{Value, json};

    use super::*;
    use crate::ModelError;

    fn assert_round_trips(payload: Value, action: ExecutorAction) {
        let decoded = ExecutorAction::from_json(&payload.to_string()).unwrap();
        assert_eq!(decoded, action);

        let encoded: Value = serde_json::from_str(&action.to_json().unwrap()).unwrap();
        assert_eq!(encoded, payload);
    }

    #[test]
    fn download_round_trips() {
        assert_round_trips(
            json!({
                "action": "download",
                "args": {"from": "web_location", "to": "local_location", "extract": true}
            }),
            ExecutorAction::Download(DownloadArgs {
                from: "web_location".into(),
                to: "local_location".into(),
                extract: true,
            }),
        );
    }

    #[test]
    fn upload_round_trips() {
        assert_round_trips(
            json!({
                "action": "upload",
                "args": {"from": "local_location", "to": "web_location"}
            }),
            ExecutorAction::Upload(UploadArgs {
                from: "local_location".into(),
                to: "web_location".into(),
            }),
        );
    }

    #[test]
    fn run_round_trips_with_nanosecond_timeout() {
        assert_round_trips(
            json!({
                "action": "run",
                "args": {
                    "script": "rm -rf /",
                    "timeout": 10_000_000,
                    "env": [["FOO", "1"], ["BAR", "2"]]
                }
            }),
            ExecutorAction::Run(RunArgs {
                script: "rm -rf /".into(),
                timeout: Duration::from_millis(10),
                env: [("FOO", "1"), ("BAR", "2")].into_iter().collect(),
            }),
        );
    }

    #[test]
    fn fetch_result_round_trips() {
        assert_round_trips(
            json!({
                "action": "fetch_result",
                "args": {"file": "/tmp/foo"}
            }),
            ExecutorAction::FetchResult(FetchResultArgs {
                file: "/tmp/foo".into(),
            }),
        );
    }

    #[test]
    fn unknown_tag_is_an_invalid_conversion() {
        let err = ExecutorAction::from_json(r#"{"action":"buttz","args":{"from":"space"}}"#)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidActionConversion));
    }

    #[test]
    fn composite_tags_are_not_accepted() {
        for tag in ["monitor", "try", "parallel", "serial"] {
            let payload = format!(r#"{{"action":"{tag}","args":{{}}}}"#);
            assert!(matches!(
                ExecutorAction::from_json(&payload),
                Err(ModelError::InvalidActionConversion)
            ));
        }
    }

    #[test]
    fn missing_required_args_fail_decoding() {
        // `extract` omitted
        let err = ExecutorAction::from_json(
            r#"{"action":"download","args":{"from":"http://x","to":"/c"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidActionConversion));
    }

    #[test]
    fn unknown_fields_inside_args_are_ignored() {
        let decoded = ExecutorAction::from_json(
            r#"{"action":"upload","args":{"from":"/a","to":"http://b","compress":true}}"#,
        )
        .unwrap();
        assert_eq!(
            decoded,
            ExecutorAction::Upload(UploadArgs {
                from: "/a".into(),
                to: "http://b".into(),
            })
        );
    }

    #[test]
    fn zero_timeout_survives_the_round_trip() {
        let action = ExecutorAction::Run(RunArgs {
            script: "true".into(),
            timeout: Duration::ZERO,
            env: Env::new(),
        });
        let back = ExecutorAction::from_json(&action.to_json().unwrap()).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn tags_match_the_wire() {
        let run = ExecutorAction::Run(RunArgs {
            script: String::new(),
            timeout: Duration::ZERO,
            env: Env::new(),
        });
        assert_eq!(run.tag(), "run");

        let fetch = ExecutorAction::FetchResult(FetchResultArgs {
            file: String::new(),
        });
        assert_eq!(fetch.tag(), "fetch_result");
    }
}
