use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        FilmgrainError::decode("x")
            .to_string()
            .contains("decode error:")
    );
    assert!(
        FilmgrainError::resource("x")
            .to_string()
            .contains("resource error:")
    );
    assert!(
        FilmgrainError::validation("x")
            .to_string()
            .contains("validation error:")
    );
}

#[test]
fn tool_failure_detail_keeps_exit_code_and_both_streams() {
    let err = FilmgrainError::ToolExecution {
        program: "filmgrainer".to_string(),
        exit_code: Some(2),
        stdout: "loading".to_string(),
        stderr: "bad input".to_string(),
    };
    let failure = err.failure();
    assert_eq!(failure.kind, FailureKind::ToolExecution);
    assert_eq!(failure.detail, "filmgrainer failed (exit 2): bad input | loading");
}

#[test]
fn signal_termination_has_no_exit_code() {
    let err = FilmgrainError::ToolExecution {
        program: "filmgrainer".to_string(),
        exit_code: None,
        stdout: String::new(),
        stderr: String::new(),
    };
    assert!(err.to_string().contains("terminated by signal"));
}

#[test]
fn launch_and_timeout_are_distinct_kinds() {
    let launch = FilmgrainError::Launch {
        program: "nope".to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    };
    assert_eq!(launch.kind(), FailureKind::Launch);
    assert!(launch.to_string().contains("'nope'"));

    let timeout = FilmgrainError::Timeout {
        program: "filmgrainer".to_string(),
        after: Duration::from_millis(1500),
    };
    assert_eq!(timeout.kind(), FailureKind::Timeout);
    assert!(timeout.to_string().contains("1.5s"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FilmgrainError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert_eq!(err.kind(), FailureKind::Internal);
}

#[test]
fn failure_serializes_kind_in_snake_case() {
    let json = serde_json::to_value(FilmgrainError::decode("corrupt").failure()).unwrap();
    assert_eq!(json["kind"], "decode");
    assert_eq!(json["detail"], "decode error: corrupt");
}
