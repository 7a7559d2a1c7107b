#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::NamedTempFile;

    use snapship_core::compression::CompressionCodec;
    use snapship_core::config::{Config, HashTiming};
    use snapship_core::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_FILE_PART_SIZE, MAX_CHUNK_SIZE};
    use snapship_core::crypto::{CipherSuite, DigestAlg};
    use snapship_core::types::BackupError;

    fn valid() -> Config {
        Config { password: "pw".into(), ..Config::default() }
    }

    #[test]
    fn password_only_config_takes_defaults() {
        let cfg = Config::from_json_str(r#"{ "password": "pw" }"#).unwrap();
        assert_eq!(cfg.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(cfg.file_part_size, DEFAULT_FILE_PART_SIZE);
        assert_eq!(cfg.codec, CompressionCodec::Deflate);
        assert_eq!(cfg.cipher, CipherSuite::Aes256Gcm);
        assert_eq!(cfg.digest, DigestAlg::Sha256);
        assert_eq!(cfg.hash_timing, HashTiming::AtClose);
        assert!(cfg.delete_after_receive);
        assert!(!cfg.multi_incremental);
        assert!(!cfg.load_remote);
        assert_eq!(cfg.idle_timeout, None);
    }

    #[test]
    fn every_field_parses() {
        let cfg = Config::from_json_str(
            r#"{
                "chunk_size": 4096,
                "file_part_size": 1048576,
                "password": "pw",
                "codec": "zstd",
                "cipher": "chacha20-poly1305",
                "digest": "blake3",
                "delete_after_receive": false,
                "multi_incremental": true,
                "load_remote": true,
                "hash_timing": "at_upload",
                "poll_interval": 250,
                "idle_timeout": 60000,
                "max_record_len": 8192,
                "root_dataset": "ExternalPool",
                "target_pool": "Backup",
                "create_finished_marker": true
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.chunk_size, 4096);
        assert_eq!(cfg.codec, CompressionCodec::Zstd);
        assert_eq!(cfg.cipher, CipherSuite::Chacha20Poly1305);
        assert_eq!(cfg.digest, DigestAlg::Blake3);
        assert_eq!(cfg.hash_timing, HashTiming::AtUpload);
        assert_eq!(cfg.poll_interval, Duration::from_millis(250));
        assert_eq!(cfg.idle_timeout, Some(Duration::from_secs(60)));
        assert!(cfg.multi_incremental && cfg.load_remote && cfg.create_finished_marker);
        assert!(!cfg.delete_after_receive);
        assert_eq!(cfg.root_dataset, "ExternalPool");
    }

    #[test]
    fn json_roundtrip() {
        let mut cfg = valid();
        cfg.idle_timeout = Some(Duration::from_millis(1500));
        cfg.codec = CompressionCodec::Lz4;
        let json = serde_json::to_string(&cfg).unwrap();
        assert_eq!(Config::from_json_str(&json).unwrap(), cfg);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::from_json_str(r#"{ "password": "pw", "chunk": 1 }"#).unwrap_err();
        assert!(matches!(err, BackupError::Config(_)));
    }

    #[test]
    fn unknown_codec_is_rejected() {
        assert!(Config::from_json_str(r#"{ "password": "pw", "codec": "brotli" }"#).is_err());
    }

    #[test]
    fn validation() {
        assert!(valid().validate().is_ok());

        let bad = [
            Config { chunk_size: 0, ..valid() },
            Config { chunk_size: MAX_CHUNK_SIZE + 1, ..valid() },
            Config { file_part_size: 0, ..valid() },
            Config { password: String::new(), ..valid() },
            Config { chunk_size: 4096, max_record_len: 4096, ..valid() },
            Config { poll_interval: Duration::ZERO, ..valid() },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(BackupError::Config(_))), "{:?}", cfg);
        }
    }

    #[test]
    fn missing_password_fails_on_load() {
        assert!(matches!(Config::from_json_str("{}"), Err(BackupError::Config(_))));
    }

    #[test]
    fn loads_from_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{ "password": "pw", "target_pool": "Backup" }"#).unwrap();
        let cfg = Config::from_json_file(file.path()).unwrap();
        assert_eq!(cfg.target_pool, "Backup");

        let missing = file.path().with_extension("missing");
        assert!(matches!(Config::from_json_file(&missing), Err(BackupError::Io(_))));
    }
}
