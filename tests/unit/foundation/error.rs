use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        FitError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(FitError::data("x").to_string().contains("data error:"));
    assert!(FitError::no_data("x").to_string().contains("no data:"));
    assert!(FitError::context("x").to_string().contains("context error:"));
    assert!(
        FitError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn only_context_errors_are_fatal() {
    assert!(FitError::context("lost device").is_fatal());
    assert!(!FitError::data("bad replacement").is_fatal());
    assert!(!FitError::CallInFlight.is_fatal());
    assert!(!FitError::EngineStopped.is_fatal());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FitError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
