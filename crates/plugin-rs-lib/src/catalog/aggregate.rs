//! Fan-out over channels and repositories.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use super::fetch::{Fetch, fetch_with_timeout};
use super::package::Package;
use super::{Channel, Repository};
use super::decode;

/// Fetches every channel and every repository they list, returning every package found.
///
/// All channels are fetched concurrently. Each channel's repositories start as soon as that channel has been read,
/// without waiting on slower channels.
/// A source that fails to fetch or decode is logged and treated as empty.
/// Package order is whatever order repositories finished in.
///
/// Dropping the returned future aborts every request still in flight.
///
/// # Parameters
/// - `fetcher` - Used for every request.
/// - `channels` - Channel addresses to start from.
/// - `timeout` - Upper bound for each individual request.
pub async fn fetch_all_sources(fetcher: Arc<dyn Fetch>, channels: &[Channel], timeout: Duration) -> Vec<Package> {
	let mut channel_tasks = JoinSet::new();
	for channel in channels {
		let fetcher = fetcher.clone();
		let channel = channel.clone();
		channel_tasks.spawn(async move { fetch_channel_packages(fetcher, &channel, timeout).await });
	}

	let mut packages = Vec::<Package>::new();
	while let Some(joined) = channel_tasks.join_next().await {
		match joined {
			Ok(found) => packages.extend(found),
			Err(e) => log::warn!("Channel fetch task failed: {}", e),
		}
	}
	packages
}

/// Fetches one channel then all of its repositories concurrently.
async fn fetch_channel_packages(fetcher: Arc<dyn Fetch>, channel: &Channel, timeout: Duration) -> Vec<Package> {
	let repositories = fetch_channel(fetcher.as_ref(), channel, timeout).await;
	log::debug!("Channel {} lists {} repositories", channel, repositories.len());

	/* Dropped along with this task, aborting the repository fetches. */
	let mut repository_tasks = JoinSet::new();
	for repository in repositories {
		let fetcher = fetcher.clone();
		repository_tasks.spawn(async move { fetch_repository(fetcher.as_ref(), &repository, timeout).await });
	}

	let mut packages = Vec::<Package>::new();
	while let Some(joined) = repository_tasks.join_next().await {
		match joined {
			Ok(found) => packages.extend(found),
			Err(e) => log::warn!("Repository fetch task failed: {}", e),
		}
	}
	packages
}

async fn fetch_channel(fetcher: &dyn Fetch, channel: &Channel, timeout: Duration) -> Vec<Repository> {
	let data = match fetch_with_timeout(fetcher, &channel.0, timeout).await {
		Ok(data) => data,
		Err(e) => {
			log::warn!("Failed to fetch channel {}: {}", channel, e);
			return Vec::new();
		},
	};
	match decode::decode_channel(&data) {
		Ok(repositories) => repositories,
		Err(e) => {
			log::warn!("Failed to decode channel {}: {}", channel, e);
			Vec::new()
		},
	}
}

async fn fetch_repository(fetcher: &dyn Fetch, repository: &Repository, timeout: Duration) -> Vec<Package> {
	let data = match fetch_with_timeout(fetcher, &repository.0, timeout).await {
		Ok(data) => data,
		Err(e) => {
			log::warn!("Failed to fetch repository {}: {}", repository, e);
			return Vec::new();
		},
	};
	match decode::decode_repository(&data) {
		Ok(packages) => {
			log::debug!("Repository {} lists {} packages", repository, packages.len());
			packages
		},
		Err(e) => {
			log::warn!("Failed to decode repository {}: {}", repository, e);
			Vec::new()
		},
	}
}
