//! Unit tests for VmConfig

use core_types::{
    FieldAccessMode, MissingSymbolPolicy, OverflowPolicy, PacingMode, UncaughtPolicy, VmConfig,
};

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_builder_methods() {
        let config = VmConfig::default()
            .with_pacing(PacingMode::Strict)
            .with_overflow(OverflowPolicy::Abort)
            .with_missing_symbol(MissingSymbolPolicy::Abort)
            .with_field_access(FieldAccessMode::PrecompiledBridge)
            .with_uncaught(UncaughtPolicy::Abort)
            .with_slice_cycles(7)
            .with_max_frame_depth(9);
        assert_eq!(config.pacing, PacingMode::Strict);
        assert_eq!(config.slice_cycles, 7);
        assert_eq!(config.max_frame_depth, 9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_keeps_defaults_for_missing_keys() {
        let config = VmConfig::from_json(r#"{ "heap_capacity": 100 }"#).unwrap();
        assert_eq!(config.heap_capacity, 100);
        assert_eq!(config.slice_cycles, VmConfig::default().slice_cycles);
    }

    #[test]
    fn test_json_round_trip() {
        let config = VmConfig::default().with_pacing(PacingMode::Weak);
        let text = serde_json::to_string(&config).unwrap();
        assert!(text.contains("\"weak\""));
        assert_eq!(VmConfig::from_json(&text).unwrap(), config);
    }

    #[test]
    fn test_paced_mode_needs_rate() {
        let result = VmConfig::from_json(r#"{ "pacing": "strict", "target_cycles_per_second": 0 }"#);
        assert!(result.is_err());
    }
}
