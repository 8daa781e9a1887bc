//! Environment layering lives in its own test binary so the variables it sets
//! cannot leak into the unit tests running alongside it.

use querykit_db::NamerKind;
use runtime::AppConfig;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_env_overrides_yaml() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("cfg.yaml");
    fs::write(
        &cfg_path,
        r#"
query:
  default_limit: 20
  max_limit: 100
policies:
  products:
    sortable: [name]
"#,
    )
    .unwrap();

    std::env::set_var("APP__QUERY__MAX_LIMIT", "40");
    std::env::set_var("APP__QUERY__PARAM_NAMES", "random");
    let config = AppConfig::load_layered(&cfg_path);
    std::env::remove_var("APP__QUERY__MAX_LIMIT");
    std::env::remove_var("APP__QUERY__PARAM_NAMES");

    let config = config.unwrap();
    assert_eq!(config.query.default_limit, 20);
    assert_eq!(config.query.max_limit, 40);
    assert_eq!(config.query.param_names, NamerKind::Random);
    assert!(config.policy("products").is_ok());
}
