use std::sync::Arc;

#[tokio::main]
async fn main() {
	env_logger::init();

	let mut opts;

	/* Parse console input */
	let parsed_options = {
		let args: Vec<String> = std::env::args().collect();

		opts = getopts::Options::new();
		opts.optflag( "h", "help",         "Show help");
		opts.optopt(  "",  "host-name",    "Name plugins use to require the host", "NAME");
		opts.optopt(  "",  "host-version", "Version of the host plugins are checked against", "VERSION");
		opts.optopt(  "c", "config",       "Read the config from this file instead of the default location", "PATH");
		opts.parsing_style(getopts::ParsingStyle::FloatingFrees);

		let parsed_options = match opts.parse(args.get(1..).unwrap_or_default()) {
			Ok(m)  => { m }
			Err(e) => { println!("Unable to parse options: {}", e); return }
		};

		if parsed_options.opt_present("h") || parsed_options.free.is_empty() {
			eprintln!("{}", opts.usage("Usage: plugin-rs-terminal [options] (install NAME | update | remove NAME | search TEXT | list)"));
			return;
		}

		parsed_options
	};

	let config = match parsed_options.opt_str("config") {
		Some(path) => plugin_rs::Config::load_from_file(path),
		None => plugin_rs::Config::load_from_disk(),
	};
	let config = config.unwrap_or_else(|e| {
		log::warn!("Failed to read config file: {}", e);
		log::warn!("Using default config.");
		plugin_rs::Config::default()
	});

	let host_name = parsed_options.opt_str("host-name").unwrap_or_else(|| plugin_rs::host::DEFAULT_HOST_NAME.to_string());
	let host_version = parsed_options.opt_str("host-version").unwrap_or_else(|| "0.0.0".to_string());

	let manager = match create_manager(&config, host_name, host_version) {
		Ok(m) => m,
		Err(e) => { log::error!("Failed to set up plugin manager: {}", e); return },
	};

	if let Err(e) = run_command(&manager, &parsed_options.free).await {
		eprintln!("{}", e);
		if let Error::PluginRs(plugin_rs::Error::Resolution(resolution)) = &e {
			let chain = resolution.chain();
			if chain.len() > 1 {
				eprintln!("\trequirement chain: {}", chain.join(" -> "));
			}
		}
		std::process::exit(1);
	}
}

fn create_manager(config: &plugin_rs::Config, host_name: String, host_version: String) -> Result<plugin_rs::PluginManager, Error> {
	use plugin_rs::installation::{LocalStorage, DirectoryOracle};

	let fetcher = Arc::new(plugin_rs::catalog::HttpFetcher::new(config)?);
	let oracle = Arc::new(DirectoryOracle::new(LocalStorage::new(config.plugin_dir()), host_name, host_version));
	Ok(plugin_rs::PluginManager::new(config, fetcher, oracle))
}

async fn run_command(manager: &plugin_rs::PluginManager, free: &[String]) -> Result<(), Error> {
	let command = free.first().map(String::as_str).unwrap_or_default();
	let argument = || free.get(1).map(String::as_str).ok_or(Error::MissingArgument);

	match command {
		"install" => {
			let outcome = manager.install(argument()?).await?;
			println!("{}", outcome);
		},
		"update" => {
			let outcome = manager.update_all().await?;
			println!("{}", outcome);
		},
		"remove" => {
			let name = argument()?;
			manager.uninstall(name).await?;
			println!("Removed {}.", name);
		},
		"search" => {
			let found = manager.search(argument()?).await;
			if found.is_empty() {
				println!("No installable plugins found.");
			}
			for package in found {
				println!("{}", package);
				if let Some(latest) = package.latest() {
					println!("Latest: {}", latest.version);
				}
				println!();
			}
		},
		"list" => {
			for (name, version) in manager.installed() {
				println!("{} {}", name, version.as_deref().unwrap_or("unknown"));
			}
		},
		other => return Err(Error::UnknownCommand(other.to_string())),
	}
	Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	PluginRs(#[from] plugin_rs::Error),
	#[error("Missing argument")]
	MissingArgument,
	#[error("Unknown command \"{0}\"")]
	UnknownCommand(String),
}

impl From<plugin_rs::catalog::fetch::FetchError> for Error {
	fn from(value: plugin_rs::catalog::fetch::FetchError) -> Self {
		Error::PluginRs(value.into())
	}
}
