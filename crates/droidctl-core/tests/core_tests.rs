#[cfg(test)]
mod tests {
    use droidctl_core::*;

    // ── Device tests ───────────────────────────────────────────

    #[test]
    fn test_device_connection_args_serial_only() {
        let device = Device::new("abc123", None);
        assert_eq!(device.serial(), "abc123");
        assert!(device.product().is_none());
        assert_eq!(device.connection_args(), ["-s", "abc123"]);
    }

    #[test]
    fn test_device_connection_args_with_product() {
        let device = Device::new("abc123", Some("sailfish".into()));
        assert_eq!(device.connection_args(), ["-s", "abc123", "-p", "sailfish"]);
        assert_eq!(device.to_string(), "abc123 (sailfish)");
    }

    #[test]
    fn test_device_equal_for_same_address() {
        let a = Device::new("emulator-5554", None);
        let b = Device::new("emulator-5554", None);
        assert_eq!(a, b);
        assert_eq!(a.connection_args(), b.connection_args());
    }

    #[test]
    fn test_device_entry_offline() {
        let entry = DeviceEntry {
            serial: "x".into(),
            state: "offline".into(),
        };
        assert!(entry.is_offline());
        let entry = DeviceEntry {
            serial: "x".into(),
            state: "unauthorized".into(),
        };
        assert!(!entry.is_offline());
    }

    #[test]
    fn test_connection_type_flags() {
        assert_eq!(ConnectionType::Usb.flag(), "-d");
        assert_eq!(ConnectionType::Emulator.flag(), "-e");
    }

    #[test]
    fn test_shell_output_helpers() {
        let out = ShellOutput {
            exit_code: 0,
            stdout: b"hello\n".to_vec(),
            stderr: vec![],
        };
        assert!(out.success());
        assert_eq!(out.stdout_lossy(), "hello\n");
        assert_eq!(out.stderr_lossy(), "");
    }

    // ── Error tests ────────────────────────────────────────────

    #[test]
    fn test_error_device_not_found() {
        let err = DroidError::DeviceNotFound {
            serial: "zzz".into(),
        };
        assert!(err.to_string().contains("zzz"));
        assert!(err.is_find_device_error());
        assert!(DroidError::NoUniqueDevice.is_find_device_error());
    }

    #[test]
    fn test_error_shell_display() {
        let err = DroidError::Shell {
            command: vec!["ls".into(), "/nope".into()],
            stdout: vec![],
            stderr: b"No such file".to_vec(),
            exit_code: 1,
        };
        assert_eq!(err.to_string(), "`ls /nope` exited with code 1");
        assert_eq!(err.exit_code(), Some(1));
        assert!(!err.is_find_device_error());
    }

    #[test]
    fn test_error_transport_display() {
        let err = DroidError::Transport {
            command: vec!["adb".into(), "reboot".into()],
            exit_code: 1,
            stderr: "error: no devices/emulators found".into(),
        };
        let s = err.to_string();
        assert!(s.contains("adb reboot"));
        assert!(s.contains("no devices"));
        assert_eq!(err.exit_code(), Some(1));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "adb not found");
        let err: DroidError = io_err.into();
        assert!(err.to_string().contains("adb not found"));
        assert_eq!(err.exit_code(), None);
    }
}
