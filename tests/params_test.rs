//! Plugin parameter parsing

use layergen::{CommandMode, Error, GenerationConfig};
use rstest::rstest;
use std::path::PathBuf;

#[rstest]
#[case("verbose=true", true)]
#[case("verbose=1", true)]
#[case("verbose=yes", false)]
#[case("verbose=", false)]
fn test_bool_values(#[case] params: &str, #[case] expected: bool) {
    assert_eq!(GenerationConfig::from_params(params).unwrap().verbose, expected);
}

#[rstest]
#[case("cmd=new", Some(CommandMode::Initialize))]
#[case("command=update", Some(CommandMode::Update))]
#[case("command=UPDATE", Some(CommandMode::Update))]
#[case("", None)]
fn test_command(#[case] params: &str, #[case] expected: Option<CommandMode>) {
    assert_eq!(GenerationConfig::from_params(params).unwrap().command, expected);
}

#[rstest]
#[case::unknown_key("handler=biz")]
#[case::unknown_command("cmd=client")]
#[case::bare_segment("module=x,stray")]
#[case::empty_option("option_package:api=")]
fn test_rejected(#[case] params: &str) {
    let err = GenerationConfig::from_params(params).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "unexpected error: {:?}", err);
    assert!(err.is_fatal());
}

#[test]
fn test_full_parameter_string() {
    let config = GenerationConfig::from_params(
        "out_dir=gen,handler_dir=app/handler,router_dir=app/router,model_dir=app/model,\
         client_dir=app/client,base_domain=http://localhost:8888,go_module=example.com/svc,\
         service=greeter,need_go_mod=true,customize_layout=layout.yaml,\
         customize_package=package.yaml,option_package:api=example.com/api",
    )
    .unwrap();

    assert_eq!(config.out_dir, PathBuf::from("gen"));
    assert_eq!(config.handler_dir, "app/handler");
    assert_eq!(config.router_dir, "app/router");
    assert_eq!(config.model_dir, "app/model");
    assert_eq!(config.client_dir.as_deref(), Some("app/client"));
    assert_eq!(config.base_domain, "http://localhost:8888");
    assert_eq!(config.module.as_deref(), Some("example.com/svc"));
    assert_eq!(config.service_name, "greeter");
    assert!(config.need_go_mod);
    assert_eq!(config.customize_layout, Some(PathBuf::from("layout.yaml")));
    assert_eq!(config.customize_package, Some(PathBuf::from("package.yaml")));
    assert_eq!(config.options["api"], "example.com/api");
}

#[test]
fn test_empty_segments_ignored() {
    let config = GenerationConfig::from_params(",,module=x,,").unwrap();
    assert_eq!(config.module.as_deref(), Some("x"));
}

#[test]
fn test_exclude_list() {
    let config =
        GenerationConfig::from_params("exclude_file=a.go,b/*.go,c.go,verbose=true").unwrap();
    assert_eq!(config.excludes, vec!["a.go", "b/*.go", "c.go"]);
    assert!(config.verbose);
}
