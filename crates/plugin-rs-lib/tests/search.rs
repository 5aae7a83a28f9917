use std::sync::Arc;

use plugin_rs::PluginManager;
use plugin_rs_test_utils::*;

const CHANNEL: &str = "https://plugins.example/channel.json";
const REPOSITORY: &str = "https://plugins.example/repository.json";

fn manager(dir: &std::path::Path, oracle: StaticOracle) -> PluginManager {
	let repository = repository_document(vec![
		package_entry("Linter", vec![
			version_entry("1.0.0", "https://plugins.example/linter.zip", &[("host", ">=2.0.0")]),
		]),
		package_entry("lint-future", vec![
			version_entry("1.0.0", "https://plugins.example/lint-future.zip", &[("host", ">=3.0.0")]),
		]),
		package_entry("lint-fmt", vec![
			version_entry("1.0.0", "https://plugins.example/lint-fmt.zip", &[("fmt-tool", ">=2.0.0")]),
		]),
		package_entry("fmt-tool", vec![
			version_entry("1.0.0", "https://plugins.example/fmt-tool-1.zip", &[]),
			version_entry("2.0.0", "https://plugins.example/fmt-tool-2.zip", &[]),
		]),
	]).unwrap();

	let fetcher = StaticFetcher::new()
		.with_document(CHANNEL, channel_document(&[REPOSITORY]).unwrap())
		.with_document(REPOSITORY, repository);
	PluginManager::new(&test_config(dir, &[CHANNEL]), Arc::new(fetcher), Arc::new(oracle))
}

fn names(packages: &[plugin_rs::catalog::package::Package]) -> Vec<&str> {
	packages.iter().map(|p| p.name.as_str()).collect()
}

#[tokio::test]
async fn search_only_installable() {
	let dir = tempfile::tempdir().unwrap();
	let manager = manager(dir.path(), StaticOracle::new("host", "2.1.0"));

	let found = manager.search("LINT").await;
	assert_eq!(names(&found), ["Linter", "lint-fmt"]);
}

#[tokio::test]
async fn installed_versions_limit_search() {
	let dir = tempfile::tempdir().unwrap();
	let manager = manager(dir.path(), StaticOracle::new("host", "2.1.0").with_installed("fmt-tool", "1.0.0"));

	/* lint-fmt would need a newer fmt-tool than the one installed. */
	let found = manager.search("^lint").await;
	assert_eq!(names(&found), ["Linter"]);
}

#[tokio::test]
async fn search_without_match() {
	let dir = tempfile::tempdir().unwrap();
	let manager = manager(dir.path(), StaticOracle::new("host", "2.1.0"));
	assert!(manager.search("nothing-like-this").await.is_empty());
}
