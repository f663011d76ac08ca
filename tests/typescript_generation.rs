//! TypeScript Generation Tests
//!
//! Validates that the serialisable session types can be exported to
//! TypeScript when the tauri feature is enabled.

#[cfg(feature = "tauri")]
#[test]
fn test_core_types_implement_specta_type() {
    use specta::Type;

    // If this compiles, all types are properly configured for TypeScript export.
    fn assert_type<T: Type>() {}

    assert_type::<scopestream::DeviceStatus>();
    assert_type::<scopestream::LogEvent>();
    assert_type::<scopestream::LogLevel>();
    assert_type::<scopestream::SessionPhase>();
    assert_type::<scopestream::SessionSnapshot>();
    assert_type::<scopestream::SessionStats>();
    assert_type::<scopestream::StreamConfig>();
    assert_type::<scopestream::DeviceConfig>();
}

#[cfg(not(feature = "tauri"))]
#[test]
fn test_tauri_feature_disabled() {
    // Types still serialise without specta
    let status = scopestream::DeviceStatus::default();
    assert!(!status.connected);
}
