use xfabric_engine::config::ConfigParser;
use xfabric_engine::error::EngineError;

/// Reads configuration written in HCL.
///
/// Blocks map to nested tables; lists of tables are written as list
/// attributes (`topics = [{ ... }]`).
pub struct HclParser;

impl ConfigParser for HclParser {
    fn extensions(&self) -> &[&str] {
        &["hcl"]
    }

    fn parse(&self, content: &str) -> Result<serde_json::Value, EngineError> {
        hcl::from_str(content).map_err(|e| EngineError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xfabric_engine::config::{self, TomlParser};
    use xfabric_engine::EngineConfig;

    #[test]
    fn engine_config_from_hcl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.hcl");
        std::fs::write(
            &path,
            r#"
            bundles = ["schemas/orders.avpr"]

            fetcher {
              connect_timeout_ms = 1000
              https_only         = true
            }
            "#,
        )
        .unwrap();

        let config: EngineConfig = config::load(&path, &[&TomlParser, &HclParser]).unwrap();
        assert_eq!(config.bundles.len(), 1);
        assert_eq!(config.fetcher.connect_timeout_ms, 1000);
        assert_eq!(config.fetcher.read_timeout_ms, 7_000);
    }

    #[test]
    fn syntax_errors_are_config_errors() {
        assert!(matches!(
            HclParser.parse("bundles = ["),
            Err(EngineError::Config(_))
        ));
    }
}
