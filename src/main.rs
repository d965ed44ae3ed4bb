use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use node_build::config::RuntimeConfig;
use node_build::logging::{self, LogOptions};
use node_build::runtime::cache::RuntimeCache;
use node_build::runtime::index::NodeDistIndex;
use node_build::runtime::locator::NodeLocator;
use node_build::runtime::notifier::TracingNotifier;
use node_build::runtime::requirement::VersionRequirement;

#[derive(Parser)]
#[command(name = "node-build")]
#[command(version, about = "Locate or provision a Node.js runtime for frontend builds")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding installed runtimes
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Base URL of the Node.js distribution site
    #[arg(long, global = true)]
    index_url: Option<String>,

    /// Log as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find a runtime on the system or in the cache, installing one if needed
    Resolve {
        /// Version requirement; defaults to `engines.node` from package.json
        #[arg(long)]
        requirement: Option<String>,
        /// Directory containing package.json
        #[arg(long)]
        source_dir: Option<PathBuf>,
        /// Consider non-LTS releases when installing
        #[arg(long)]
        no_lts: bool,
        /// Node executable to try before the cache
        #[arg(long)]
        node_executable: Option<String>,
    },
    /// Install the best matching release, even if one is already cached
    Install {
        requirement: Option<String>,
        #[arg(long)]
        no_lts: bool,
    },
    /// Print the executable of the best cached runtime
    Which { requirement: Option<String> },
    /// List cached runtimes, highest version first
    List,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _guard = logging::init(&LogOptions {
        json: cli.log_json,
        file: cli.log_file.clone(),
    });

    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::from_file(path)?,
        None => RuntimeConfig::default(),
    };
    if let Some(cache_dir) = cli.cache_dir {
        config.cache_dir = Some(cache_dir);
    }
    if let Some(index_url) = cli.index_url {
        config.index_url = index_url;
    }

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command, config))
}

async fn run(command: Command, mut config: RuntimeConfig) -> anyhow::Result<()> {
    let index = Arc::new(NodeDistIndex::new(&config.index_url));
    let cache = RuntimeCache::new(&config.resolved_cache_dir(), index)?;

    match command {
        Command::Resolve {
            requirement,
            source_dir,
            no_lts,
            node_executable,
        } => {
            if let Some(source_dir) = source_dir {
                config.source_dir = source_dir;
            }
            if node_executable.is_some() {
                config.node_executable = node_executable;
            }
            config.lts &= !no_lts;

            let locator = NodeLocator::new(config, cache);
            let resolved = match parse_requirement(requirement.as_deref())? {
                Some(requirement) => Some(
                    locator
                        .require_node(Some(&requirement), &TracingNotifier)
                        .await?,
                ),
                None => locator.locate(&TracingNotifier).await?,
            };

            match resolved {
                Some(resolved) => {
                    println!("node\t{}", resolved.node.display());
                    println!("npm\t{}", resolved.npm.display());
                    println!("source\t{}", resolved.source);
                }
                None => println!("Node.js is not required"),
            }
        }
        Command::Install {
            requirement,
            no_lts,
        } => {
            let requirement = parse_requirement(requirement.as_deref())?;
            let node = cache
                .install(requirement.as_ref(), config.lts && !no_lts, &TracingNotifier)
                .await?;
            println!("{}", node.display());
        }
        Command::Which { requirement } => {
            let requirement = parse_requirement(requirement.as_deref())?;
            println!("{}", cache.get(requirement.as_ref())?.display());
        }
        Command::List => {
            for runtime in cache.installed()? {
                println!("v{}\t{}", runtime.version, runtime.dir.display());
            }
        }
    }

    Ok(())
}

fn parse_requirement(requirement: Option<&str>) -> anyhow::Result<Option<VersionRequirement>> {
    Ok(requirement.map(VersionRequirement::parse).transpose()?)
}
