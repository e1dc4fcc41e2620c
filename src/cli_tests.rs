//! # CLI Parsing Tests
//!
//! Tests for command-line argument parsing: subcommands, global flags,
//! output formats and conflicts.

#[cfg(test)]
mod tests {
    use clap::Parser;
    use std::path::PathBuf;

    use crate::cli::{Cli, Commands, OutputFormat};

    #[test]
    fn test_cli_help() {
        let result = Cli::try_parse_from(["ncslice", "--help"]);
        assert!(result.is_err()); // --help causes early exit with "error"

        let error = result.unwrap_err();
        assert!(
            error
                .to_string()
                .contains("Inspect and decode coverage slices")
        );
    }

    #[test]
    fn test_cli_version() {
        let result = Cli::try_parse_from(["ncslice", "--version"]);
        assert!(result.is_err()); // --version causes early exit
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "ncslice",
            "--verbose",
            "--output-format",
            "json",
            "--ancillary",
            "/path/to/aux.json",
            "info",
            "data.nc",
        ]);

        assert!(cli.verbose);
        assert!(!cli.quiet);
        assert_eq!(cli.output_format, OutputFormat::Json);
        assert_eq!(cli.ancillary, Some(PathBuf::from("/path/to/aux.json")));
    }

    #[test]
    fn test_verbose_quiet_conflict() {
        let result = Cli::try_parse_from(["ncslice", "--verbose", "--quiet", "check", "data.nc"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_command() {
        let cli = Cli::parse_from(["ncslice", "check", "data.nc"]);
        if let Commands::Check { input } = &cli.command {
            assert_eq!(input, "data.nc");
        } else {
            panic!("Expected Check command");
        }
    }

    #[test]
    fn test_info_command_s3_input() {
        let cli = Cli::parse_from(["ncslice", "info", "s3://bucket/ocean/sst.nc"]);
        if let Commands::Info { input } = &cli.command {
            assert_eq!(input, "s3://bucket/ocean/sst.nc");
        } else {
            panic!("Expected Info command");
        }
    }

    #[test]
    fn test_slices_command_with_filters() {
        let cli = Cli::parse_from([
            "ncslice", "slices", "data.nc", "--coverage", "z", "--limit", "10",
        ]);
        if let Commands::Slices {
            input,
            coverage,
            limit,
        } = &cli.command
        {
            assert_eq!(input, "data.nc");
            assert_eq!(coverage.as_deref(), Some("z"));
            assert_eq!(*limit, Some(10));
        } else {
            panic!("Expected Slices command");
        }
    }

    #[test]
    fn test_read_command_index() {
        let cli = Cli::parse_from(["ncslice", "read", "data.nc", "42"]);
        if let Commands::Read { input, index } = &cli.command {
            assert_eq!(input, "data.nc");
            assert_eq!(*index, 42);
        } else {
            panic!("Expected Read command");
        }
    }

    #[test]
    fn test_read_command_rejects_negative_index() {
        let result = Cli::try_parse_from(["ncslice", "read", "data.nc", "-1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_stats_command() {
        let cli = Cli::parse_from(["ncslice", "--quiet", "stats", "data.nc"]);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Stats { .. }));
    }

    #[test]
    fn test_completions_command() {
        let cli = Cli::parse_from(["ncslice", "completions", "bash"]);
        assert!(matches!(cli.command, Commands::Completions { .. }));
    }

    #[test]
    fn test_output_format_values() {
        for (text, expected) in [
            ("human", OutputFormat::Human),
            ("json", OutputFormat::Json),
            ("yaml", OutputFormat::Yaml),
        ] {
            let cli = Cli::parse_from(["ncslice", "--output-format", text, "info", "data.nc"]);
            assert_eq!(cli.output_format, expected);
        }
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        let result = Cli::try_parse_from(["ncslice", "frobnicate", "data.nc"]);
        assert!(result.is_err());
    }
}

#[cfg(test)]
mod storage_tests {
    use crate::storage::{InputError, parse_s3_path};

    #[test]
    fn test_parse_s3_path() {
        let (bucket, key) = parse_s3_path("s3://my-bucket/path/to/data.nc").unwrap();
        assert_eq!(bucket, "my-bucket");
        assert_eq!(key, "path/to/data.nc");
    }

    #[test]
    fn test_parse_s3_path_rejects_malformed() {
        assert!(matches!(
            parse_s3_path("http://bucket/key"),
            Err(InputError::InvalidS3Path(_))
        ));
        assert!(matches!(
            parse_s3_path("s3://bucket-only"),
            Err(InputError::InvalidS3Path(_))
        ));
        assert!(matches!(
            parse_s3_path("s3:///no-bucket"),
            Err(InputError::InvalidS3Path(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_local_input() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("data.nc");
        std::fs::write(&path, b"CDF\x01")?;

        let source = crate::storage::resolve_input(path.to_str().unwrap()).await?;
        assert_eq!(source.path(), path);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_missing_local_input() {
        let err = crate::storage::resolve_input("/definitely/not/here.nc")
            .await
            .unwrap_err();
        assert!(matches!(err, InputError::NotFound(_)));
    }
}
