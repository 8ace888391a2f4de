#[cfg(test)]
mod tests {
    use droidctl_config::ConfigLoader;
    use droidctl_config::schema::*;
    use std::io::Write;
    use std::path::PathBuf;

    // ── Default tests ──────────────────────────────────────────

    #[test]
    fn test_bridge_config_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.adb_path, PathBuf::from("adb"));
        assert_eq!(config.serial_env, "ANDROID_SERIAL");
        assert!(config.product.is_none());
        assert!(config.kill_popen_at_exit);
    }

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, "pretty");
    }

    #[test]
    fn test_defaults_validate_cleanly() {
        let warnings = DroidConfig::default().validate().unwrap();
        assert!(warnings.is_empty());
    }

    // ── TOML tests ─────────────────────────────────────────────

    #[test]
    fn test_config_toml_roundtrip() {
        let config = DroidConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let restored: DroidConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(restored.bridge.adb_path, config.bridge.adb_path);
        assert_eq!(restored.logging.format, config.logging.format);
    }

    #[test]
    fn test_partial_toml_applies_defaults() {
        let toml_str = r#"
[bridge]
product = "walleye"
"#;
        let config: DroidConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bridge.product.as_deref(), Some("walleye"));
        assert_eq!(config.bridge.adb_path, PathBuf::from("adb"));
        assert_eq!(config.bridge.serial_env, "ANDROID_SERIAL");
        assert_eq!(config.logging.level, "warn");
    }

    // ── Validation tests ───────────────────────────────────────

    #[test]
    fn test_validate_empty_adb_path_is_error() {
        let mut config = DroidConfig::default();
        config.bridge.adb_path = PathBuf::new();
        let err = config.validate().unwrap_err();
        assert!(err.contains("bridge.adb_path"));
    }

    #[test]
    fn test_validate_empty_serial_env_is_error() {
        let mut config = DroidConfig::default();
        config.bridge.serial_env = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_level_is_warning() {
        let mut config = DroidConfig::default();
        config.logging.level = "chatty".into();
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "logging.level");
        assert_eq!(warnings[0].severity, WarningSeverity::Warning);
    }

    #[test]
    fn test_validate_unknown_format_is_error() {
        let mut config = DroidConfig::default();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_blank_product_warns() {
        let mut config = DroidConfig::default();
        config.bridge.product = Some(String::new());
        let warnings = config.validate().unwrap();
        assert!(warnings.iter().any(|w| w.field == "bridge.product"));
    }

    // ── Env override tests ─────────────────────────────────────

    #[test]
    fn test_env_overrides_apply() {
        let config = ConfigLoader::apply_env_overrides(DroidConfig::default(), |k| match k {
            "DROIDCTL_ADB_PATH" => Some("/opt/platform-tools/adb".into()),
            "DROIDCTL_LOG_LEVEL" => Some("debug".into()),
            _ => None,
        });
        assert_eq!(config.bridge.adb_path, PathBuf::from("/opt/platform-tools/adb"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_env_overrides_absent_keep_config() {
        let mut base = DroidConfig::default();
        base.bridge.adb_path = PathBuf::from("/usr/bin/adb");
        let config = ConfigLoader::apply_env_overrides(base, |_| None);
        assert_eq!(config.bridge.adb_path, PathBuf::from("/usr/bin/adb"));
    }

    // ── ConfigLoader tests ─────────────────────────────────────

    #[test]
    fn test_config_loader_with_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("droidctl.toml");
        let mut f = std::fs::File::create(&config_path).unwrap();
        writeln!(
            f,
            r#"
[bridge]
serial_env = "MY_TEST_SERIAL"
kill_popen_at_exit = false

[logging]
format = "compact"
"#
        )
        .unwrap();

        let loader = ConfigLoader::load(Some(config_path.as_path())).unwrap();
        let config = loader.get();
        assert_eq!(config.bridge.serial_env, "MY_TEST_SERIAL");
        assert!(!config.bridge.kill_popen_at_exit);
        assert_eq!(config.logging.format, "compact");
        assert_eq!(loader.path(), config_path.as_path());
    }

    #[test]
    fn test_config_loader_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("absent.toml");
        let loader = ConfigLoader::load(Some(config_path.as_path())).unwrap();
        assert_eq!(loader.get().bridge.serial_env, "ANDROID_SERIAL");
    }

    #[test]
    fn test_config_loader_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("droidctl.toml");
        std::fs::write(&config_path, "[bridge\nadb_path = ").unwrap();
        let result = ConfigLoader::load(Some(config_path.as_path()));
        assert!(matches!(result, Err(droidctl_core::DroidError::Config(_))));
    }

    #[test]
    fn test_config_loader_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("droidctl.toml");
        std::fs::write(&config_path, "[bridge]\nserial_env = \"  \"\n").unwrap();
        match ConfigLoader::load(Some(config_path.as_path())) {
            Err(droidctl_core::DroidError::ConfigValidation { field, reason }) => {
                assert!(field.ends_with("droidctl.toml"));
                assert!(reason.contains("bridge.serial_env"));
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("blank serial_env should be rejected"),
        }
    }

    #[test]
    fn test_config_loader_reload() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("droidctl.toml");
        std::fs::write(&config_path, "[bridge]\nproduct = \"one\"\n").unwrap();

        let loader = ConfigLoader::load(Some(config_path.as_path())).unwrap();
        assert_eq!(loader.get().bridge.product.as_deref(), Some("one"));

        std::fs::write(&config_path, "[bridge]\nproduct = \"two\"\n").unwrap();
        loader.reload().unwrap();
        assert_eq!(loader.get().bridge.product.as_deref(), Some("two"));
        assert_eq!(loader.shared().read().bridge.product.as_deref(), Some("two"));
    }

    // ── JSON roundtrip ─────────────────────────────────────────

    #[test]
    fn test_config_json_roundtrip() {
        let config = DroidConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: DroidConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.bridge.serial_env, config.bridge.serial_env);
    }
}
