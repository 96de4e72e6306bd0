use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use ega_metadata::config::{ConfigLoader, ResolvedConfig};
use ega_metadata::daco::{DacoClient, DacoHttpClient};
use ega_metadata::domain::{DatasetId, FilterType};
use ega_metadata::error::EgaError;
use ega_metadata::fetch::HttpTransport;
use ega_metadata::output::{AccessResult, JsonOutput};
use ega_metadata::reader::ArchiveReader;
use ega_metadata::resolver::ResourceResolver;
use ega_metadata::runs::list_run_files;

#[derive(Parser)]
#[command(name = "ega-meta")]
#[command(about = "Fetch EGA dataset metadata archives and print them as JSON")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Read a dataset's metadata archive")]
    Read(ReadArgs),
    #[command(about = "List the files of every run in a dataset")]
    Runs(DatasetArgs),
    #[command(about = "Check whether an id is an approved DACO user")]
    Daco(DacoArgs),
    #[command(about = "Print a JSON resource from the versioned resources package")]
    Resource(ResourceArgs),
}

#[derive(Args)]
struct DatasetArgs {
    dataset_id: String,

    #[arg(long)]
    api_url: Option<String>,
}

#[derive(Args)]
struct ReadArgs {
    #[command(flatten)]
    dataset: DatasetArgs,

    #[arg(long)]
    summary: bool,
}

#[derive(Args)]
struct DacoArgs {
    id: String,

    #[arg(long, value_enum, default_value = "openid")]
    by: FilterType,
}

#[derive(Args)]
struct ResourceArgs {
    file_name: String,

    #[arg(long)]
    version: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<EgaError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &EgaError) -> u8 {
    match error {
        EgaError::InvalidDatasetId(_)
        | EgaError::MissingConfig(_)
        | EgaError::ConfigRead(_)
        | EgaError::ConfigParse(_)
        | EgaError::MissingSetting(_)
        | EgaError::MissingResourceVersion => 2,
        EgaError::NotFound(_) => 2,
        EgaError::FetchExhausted { .. }
        | EgaError::FetchFailed { .. }
        | EgaError::DacoHttp(_)
        | EgaError::DacoStatus { .. }
        | EgaError::ResourceHttp(_)
        | EgaError::ResourceStatus { .. } => 3,
        EgaError::EntryProcessing { .. } | EgaError::ArchiveRead { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Read(args) => run_read(args, config),
        Commands::Runs(args) => run_runs(args, config),
        Commands::Daco(args) => run_daco(args, config),
        Commands::Resource(args) => run_resource(args, config),
    }
}

fn reader_for(
    args: &DatasetArgs,
    mut config: ResolvedConfig,
) -> miette::Result<ArchiveReader<HttpTransport>> {
    if let Some(api_url) = &args.api_url {
        config.api_url = api_url.clone();
    }
    Ok(ArchiveReader::from_config(&config)?)
}

fn run_read(args: ReadArgs, config: ResolvedConfig) -> miette::Result<()> {
    let dataset_id: DatasetId = args.dataset.dataset_id.parse()?;
    let reader = reader_for(&args.dataset, config)?;
    let archive = reader.read(&dataset_id)?;
    if args.summary {
        JsonOutput::print_summary(&archive.summary()).into_diagnostic()
    } else {
        JsonOutput::print_archive(&archive).into_diagnostic()
    }
}

fn run_runs(args: DatasetArgs, config: ResolvedConfig) -> miette::Result<()> {
    let dataset_id: DatasetId = args.dataset_id.parse()?;
    let reader = reader_for(&args, config)?;
    let archive = reader.read(&dataset_id)?;
    let files = list_run_files(archive.runs());
    JsonOutput::print_run_files(&files).into_diagnostic()
}

fn run_daco(args: DacoArgs, config: ResolvedConfig) -> miette::Result<()> {
    let daco_url = config
        .daco_url
        .ok_or_else(|| EgaError::MissingSetting("daco_url".to_string()))?;
    let client = DacoHttpClient::new(daco_url)?;
    let has_access = client.has_access(&args.id, args.by)?;
    JsonOutput::print_access(&AccessResult {
        id: args.id,
        filter: args.by,
        has_access,
    })
    .into_diagnostic()
}

fn run_resource(args: ResourceArgs, config: ResolvedConfig) -> miette::Result<()> {
    let resolver = ResourceResolver::new(config.resource_base_url, config.resource_version)?;
    let value: serde_json::Value = resolver.resolve(&args.file_name, args.version.as_deref())?;
    JsonOutput::print_value(&value).into_diagnostic()
}
