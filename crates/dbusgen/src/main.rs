use std::env;
use std::io;
use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use dbusgen::app::artifacts::ArtifactStore;
use dbusgen::app::pipeline::Pipeline;
use dbusgen::app::session::{SessionSnapshot, SessionStore};
use dbusgen::domain::model::{ArtifactKind, GeneratorOptions};
use dbusgen::infra::bus::BusClient;
use dbusgen::infra::config::Config;

#[derive(Parser)]
#[command(
    name = "dbusgen",
    version,
    about = "Generate interface bindings from live D-Bus introspection",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Introspect a service and stage its interfaces for generation
    Fetch {
        /// Bus service name to introspect
        #[arg(long)]
        service: Option<String>,
        /// Object path on the service
        #[arg(long = "path")]
        object_path: Option<String>,
        /// Interface to send the Introspect call to
        #[arg(long)]
        interface: Option<String>,
    },
    /// List the staged interfaces and their selection state
    List,
    /// Include one staged interface by name (or exclude it with --off)
    Toggle {
        /// Interface name as reported by the bus
        name: String,
        /// Exclude instead of include
        #[arg(long)]
        off: bool,
    },
    /// Regenerate the filtered document and run the binding generator
    Generate {
        /// Base name for the .xml/.h/.cpp artifacts
        #[arg(long)]
        base_name: Option<String>,
        /// Output folder for the artifacts
        #[arg(long = "output")]
        output_dir: Option<PathBuf>,
        /// Binding generator executable
        #[arg(long)]
        generator: Option<String>,
        /// Suppress the namespace wrapper (-N)
        #[arg(long)]
        no_namespace: bool,
        /// Name the generated class (honored only for a single interface)
        #[arg(long)]
        class_name: Option<String>,
        /// Print the filtered document instead of running the generator
        #[arg(long)]
        dry_run: bool,
    },
    /// Print a generated artifact
    Show {
        #[arg(value_enum, default_value_t = ArtifactArg::Xml)]
        kind: ArtifactArg,
        #[arg(long)]
        base_name: Option<String>,
        #[arg(long = "output")]
        output_dir: Option<PathBuf>,
    },
    /// Remove the generated header and XML artifacts
    Clear {
        #[arg(long)]
        base_name: Option<String>,
        #[arg(long = "output")]
        output_dir: Option<PathBuf>,
        /// Also forget the staged document and selection
        #[arg(long)]
        session: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "kebab-case")]
enum ArtifactArg {
    Xml,
    Header,
    Source,
}

impl From<ArtifactArg> for ArtifactKind {
    fn from(value: ArtifactArg) -> Self {
        match value {
            ArtifactArg::Xml => ArtifactKind::Xml,
            ArtifactArg::Header => ArtifactKind::Header,
            ArtifactArg::Source => ArtifactKind::Source,
        }
    }
}

fn main() -> Result<()> {
    dbusgen::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Fetch {
            service,
            object_path,
            interface,
        } => fetch(service, object_path, interface),
        Commands::List => list(),
        Commands::Toggle { name, off } => toggle(&name, off),
        Commands::Generate {
            base_name,
            output_dir,
            generator,
            no_namespace,
            class_name,
            dry_run,
        } => generate(
            base_name,
            output_dir,
            generator,
            no_namespace,
            class_name,
            dry_run,
        ),
        Commands::Show {
            kind,
            base_name,
            output_dir,
        } => show(kind.into(), base_name, output_dir),
        Commands::Clear {
            base_name,
            output_dir,
            session,
        } => clear(base_name, output_dir, session),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "dbusgen", &mut io::stdout());
            Ok(())
        }
    }
}

fn fetch(
    service: Option<String>,
    object_path: Option<String>,
    interface: Option<String>,
) -> Result<()> {
    let config = Config::load()?;
    let service = service.unwrap_or_else(|| config.bus.service.clone());
    let object_path = object_path.unwrap_or_else(|| config.bus.object_path.clone());
    let interface = interface.unwrap_or_else(|| config.bus.interface.clone());

    let client = BusClient::session().map_err(|err| anyhow!(err.detail_report()))?;
    let mut pipeline = Pipeline::new();
    pipeline
        .fetch(
            &client,
            &service,
            &object_path,
            &interface,
            &config.filter.exclude,
        )
        .map_err(|err| anyhow!(err.detail_report()))?;

    let fetched_at = OffsetDateTime::now_utc().format(&Rfc3339).ok();
    let snapshot = SessionSnapshot::capture(&pipeline, &service, &object_path, fetched_at);
    session_store()?.save(&snapshot)?;

    println!(
        "fetched {} interface(s) from {service} {object_path}",
        pipeline.tree().len()
    );
    print_units(&pipeline);
    Ok(())
}

fn list() -> Result<()> {
    let config = Config::load()?;
    let snapshot = load_session()?;
    let pipeline = snapshot.restore(&config.filter.exclude);

    println!(
        "{} {} ({:?})",
        snapshot.service,
        snapshot.object_path,
        pipeline.stage()
    );
    print_units(&pipeline);
    Ok(())
}

fn toggle(name: &str, off: bool) -> Result<()> {
    let config = Config::load()?;
    let mut snapshot = load_session()?;
    let mut pipeline = snapshot.restore(&config.filter.exclude);

    if !pipeline.set_included(name, !off) {
        bail!("unknown interface '{name}'; run `dbusgen list` to see the staged names");
    }

    let fetched_at = snapshot.fetched_at.take();
    let updated =
        SessionSnapshot::capture(&pipeline, &snapshot.service, &snapshot.object_path, fetched_at);
    session_store()?.save(&updated)?;

    print_units(&pipeline);
    Ok(())
}

fn generate(
    base_name: Option<String>,
    output_dir: Option<PathBuf>,
    generator: Option<String>,
    no_namespace: bool,
    class_name: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let config = Config::load()?;
    let snapshot = load_session()?;
    let mut pipeline = snapshot.restore(&config.filter.exclude);

    if dry_run {
        print!("{}", pipeline.filtered_document());
        return Ok(());
    }

    let program = generator.unwrap_or_else(|| config.generator.program.clone());
    let options = GeneratorOptions {
        namespace_off: no_namespace,
        single_class_name: class_name.is_some(),
        class_name: class_name.unwrap_or_default(),
        base_name: base_name.unwrap_or_else(|| config.generator.base_name.clone()),
        output_dir: output_dir.unwrap_or_else(|| PathBuf::from(&config.generator.output_dir)),
    };

    let working_dir = env::current_dir()?;
    let artifacts = pipeline
        .generate(&options, &program, &working_dir)
        .map_err(|err| {
            let xml = working_dir.join(ArtifactKind::Xml.file_name(&options.base_name));
            anyhow!("{err}\nthe filtered document was kept at {}", xml.display())
        })?;

    let store = ArtifactStore::new(&options.output_dir, &options.base_name);
    let placed = pipeline.relocate(&store, &artifacts)?;

    let fetched_at = snapshot.fetched_at.clone();
    let updated =
        SessionSnapshot::capture(&pipeline, &snapshot.service, &snapshot.object_path, fetched_at);
    session_store()?.save(&updated)?;

    for artifact in &placed {
        println!("wrote {}", artifact.path.display());
    }
    Ok(())
}

fn show(kind: ArtifactKind, base_name: Option<String>, output_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::load()?;
    let store = artifact_store(&config, base_name, output_dir);
    match store.read_back(kind) {
        Some(contents) => {
            print!("{contents}");
            Ok(())
        }
        None => {
            eprintln!("not generated yet: {}", store.path_for(kind).display());
            Ok(())
        }
    }
}

fn clear(base_name: Option<String>, output_dir: Option<PathBuf>, session: bool) -> Result<()> {
    let config = Config::load()?;
    let store = artifact_store(&config, base_name, output_dir);
    store.clear()?;
    if session {
        session_store()?.clear()?;
    }
    Ok(())
}

fn artifact_store(
    config: &Config,
    base_name: Option<String>,
    output_dir: Option<PathBuf>,
) -> ArtifactStore {
    ArtifactStore::new(
        output_dir.unwrap_or_else(|| PathBuf::from(&config.generator.output_dir)),
        base_name.unwrap_or_else(|| config.generator.base_name.clone()),
    )
}

fn session_store() -> Result<SessionStore> {
    Ok(SessionStore::new(env::current_dir()?))
}

fn load_session() -> Result<SessionSnapshot> {
    session_store()?
        .load()?
        .ok_or_else(|| anyhow!("no fetched document; run `dbusgen fetch` first"))
}

fn print_units(pipeline: &Pipeline) {
    for unit in pipeline.tree().units() {
        let marker = if unit.included { 'x' } else { ' ' };
        println!("[{marker}] {}", unit.name);
    }
}
