#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use crate::config::{LLMProvider, SearchSource};
    use crate::i18n::TargetLanguage;
    use clap::Parser;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_args_default_values() {
        let args = Args::try_parse_from(["deepresearch-rs", "quantum error correction"]).unwrap();

        assert_eq!(args.topic, "quantum error correction");
        assert!(args.config.is_none());
        assert!(args.output_path.is_none());
        assert!(!args.in_memory_store);
        assert!(!args.skip_connection_check);
        assert!(!args.verbose);
    }

    #[test]
    fn test_topic_is_required() {
        assert!(Args::try_parse_from(["deepresearch-rs"]).is_err());
    }

    #[test]
    fn test_args_short_options() {
        let args = Args::try_parse_from([
            "deepresearch-rs",
            "topic",
            "-o",
            "/test/output",
            "-c",
            "/test/deepresearch.toml",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.output_path, Some(PathBuf::from("/test/output")));
        assert_eq!(args.config, Some(PathBuf::from("/test/deepresearch.toml")));
        assert!(args.verbose);
    }

    #[test]
    fn test_long_options_override_config() {
        let args = Args::try_parse_from([
            "deepresearch-rs",
            "topic",
            "--output-path",
            "/test/output",
            "--llm-provider",
            "openai",
            "--model-efficient",
            "gpt-4o-mini",
            "--model-powerful",
            "gpt-4o",
            "--llm-api-base-url",
            "http://localhost:8080/v1",
            "--llm-api-key",
            "sk-test",
            "--database-url",
            "postgres://localhost/research",
            "--search-source",
            "pubmed",
            "--number-queries",
            "5",
            "--max-results",
            "7",
            "--target-language",
            "zh",
            "--in-memory-store",
            "--skip-connection-check",
        ])
        .unwrap();

        let config = args.into_config().unwrap();
        assert_eq!(config.output_path, PathBuf::from("/test/output"));
        assert_eq!(config.llm.provider, LLMProvider::OpenAI);
        assert_eq!(config.llm.model_efficient, "gpt-4o-mini");
        assert_eq!(config.llm.model_powerful, "gpt-4o");
        assert_eq!(config.llm.api_base_url, "http://localhost:8080/v1");
        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.database.url, "postgres://localhost/research");
        assert_eq!(config.search.source, SearchSource::Pubmed);
        assert_eq!(config.search.number_queries, 5);
        assert_eq!(config.search.max_results, 7);
        assert_eq!(config.target_language, TargetLanguage::Chinese);
        assert!(config.in_memory_store);
        assert!(config.skip_connection_check);
    }

    #[test]
    fn test_unknown_provider_is_an_error() {
        let args =
            Args::try_parse_from(["deepresearch-rs", "topic", "--llm-provider", "nope"]).unwrap();
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_unknown_language_falls_back_to_default() {
        let args =
            Args::try_parse_from(["deepresearch-rs", "topic", "--target-language", "xx"]).unwrap();
        let config = args.into_config().unwrap();
        assert_eq!(config.target_language, TargetLanguage::English);
    }

    #[test]
    fn test_config_file_values_survive_absent_flags() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "in_memory_store = true\nmax_research_loops = 2\n\n[search]\nsource = \"pubmed\"\nnumber_queries = 4"
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let args = Args::try_parse_from(["deepresearch-rs", "topic", "--config", path.as_str()]).unwrap();
        let config = args.into_config().unwrap();

        assert!(config.in_memory_store);
        assert_eq!(config.max_research_loops, 2);
        assert_eq!(config.search.source, SearchSource::Pubmed);
        assert_eq!(config.search.number_queries, 4);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = Args::try_parse_from([
            "deepresearch-rs",
            "topic",
            "--config",
            "/definitely/not/here.toml",
        ])
        .unwrap();
        assert!(args.into_config().is_err());
    }
}
