use rucheck::{ProbeError, Result};

#[test]
fn test_config_error() {
    let err = ProbeError::Config("stage has no url".to_string());
    assert_eq!(err.to_string(), "Configuration error: stage has no url");
    assert!(err.is_config());
}

#[test]
fn test_reference_error() {
    let err = ProbeError::Reference {
        placeholder: "PREV_MATCH_2_1".to_string(),
        reason: "stage 2 produced no pattern match".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "PREV_MATCH_2_1: stage 2 produced no pattern match"
    );
    assert!(!err.is_config());
}

#[test]
fn test_parse_errors_are_config() {
    let err: ProbeError = serde_json::from_str::<serde_json::Value>("{not json")
        .unwrap_err()
        .into();
    assert!(err.to_string().starts_with("JSON 解析错误"));
    assert!(err.is_config());
}

#[test]
fn test_error_conversion_from_anyhow() {
    let anyhow_err = anyhow::anyhow!("test anyhow error");
    let probe_err: ProbeError = anyhow_err.into();
    assert!(probe_err.to_string().contains("test anyhow error"));
}

#[test]
fn test_result_type() {
    fn returns_error() -> Result<()> {
        Err(ProbeError::Config("test".to_string()))
    }

    match returns_error() {
        Err(ProbeError::Config(msg)) => assert_eq!(msg, "test"),
        _ => panic!("Expected Config"),
    }
}
