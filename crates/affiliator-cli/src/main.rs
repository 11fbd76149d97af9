use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use affiliator_core::config_file::{self, ConfigFile};
use affiliator_core::{AffiliationError, Document, PreprintCorpus};
use affiliator_parsing::{
    AffiliationExtractor, Extraction, Models, OrgAfterPerson, ParsingConfigBuilder,
};
use affiliator_remote::ModelEndpoints;

mod output;

use output::ColorMode;

/// Affiliator - Extract authors and their affiliations from preprint text
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract authors and affiliations from a document
    Extract {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        models: ModelArgs,

        /// Print the API JSON document instead of a report
        #[arg(long)]
        json: bool,

        /// Path to output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Show how each block of a document was classified
    Blocks {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        models: ModelArgs,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Print the affiliation graph of a document
    Graph {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        models: ModelArgs,

        /// Print nodes and edges as JSON
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// List the preprint ids in a corpus directory
    List {
        /// Directory of `<id>.txt` files
        corpus: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Path to a plain-text document
    #[arg(conflicts_with_all = ["corpus", "id"])]
    file: Option<PathBuf>,

    /// Corpus directory to read `--id` from
    #[arg(long, requires = "id")]
    corpus: Option<PathBuf>,

    /// Preprint id within `--corpus`
    #[arg(long, requires = "corpus")]
    id: Option<String>,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Block classifier endpoint
    #[arg(long)]
    classifier_url: Option<String>,

    /// Entity tagger endpoint
    #[arg(long)]
    tagger_url: Option<String>,

    /// Minimum AFFILIATION score for a block to count as affiliation text
    #[arg(long)]
    threshold: Option<f64>,

    /// Keep an ORG that directly follows a person as the start of their affiliation
    #[arg(long)]
    append_org_after_person: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::List { corpus } => list(corpus),
        Command::Extract {
            source,
            models,
            json,
            output,
            no_color,
        } => extract(source, models, json, output, ColorMode(!no_color)),
        Command::Blocks {
            source,
            models,
            no_color,
        } => blocks(source, models, ColorMode(!no_color)),
        Command::Graph {
            source,
            models,
            json,
            no_color,
        } => graph(source, models, json, ColorMode(!no_color)),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("affiliator=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read the document named by `source`, returning a display name and its text.
fn read_source(source: &SourceArgs) -> anyhow::Result<(String, String)> {
    match (&source.file, &source.corpus, &source.id) {
        (Some(path), _, _) => {
            if !path.exists() {
                anyhow::bail!("File not found: {}", path.display());
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            Ok((name, std::fs::read_to_string(path)?))
        }
        (None, Some(corpus), Some(id)) => {
            let corpus = PreprintCorpus::open(corpus)?;
            Ok((id.clone(), corpus.text(id)?))
        }
        _ => anyhow::bail!("Give a FILE or both --corpus and --id"),
    }
}

/// Models and extractor for a run.
///
/// Resolve configuration: CLI flags > config file > env vars > defaults.
struct Pipeline {
    extractor: AffiliationExtractor,
    endpoints: ModelEndpoints,
}

impl Pipeline {
    fn resolve(args: ModelArgs) -> anyhow::Result<Self> {
        let file: ConfigFile = config_file::load_config();

        let mut builder = file
            .parsing
            .as_ref()
            .map(ParsingConfigBuilder::from_section)
            .unwrap_or_default();
        if let Some(threshold) = args.threshold {
            builder = builder.threshold(threshold);
        }
        if args.append_org_after_person {
            builder = builder.org_after_person(OrgAfterPerson::Append);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid key pattern in config: {}", e))?;

        let endpoints =
            ModelEndpoints::resolve(args.classifier_url, args.tagger_url, file.models.as_ref());
        tracing::debug!(
            classifier = %endpoints.classifier_url,
            tagger = %endpoints.tagger_url,
            "resolved model endpoints"
        );

        Ok(Self {
            extractor: AffiliationExtractor::with_config(config),
            endpoints,
        })
    }

    /// Run the pipeline, separating "nothing found" from real failures.
    fn extract(&self, text: &str) -> anyhow::Result<Result<Extraction, AffiliationError>> {
        let (classifier, tagger) = self.endpoints.connect()?;
        let models = Models::new(&classifier, &tagger);
        match self.extractor.extract(text, models) {
            Ok(extraction) => Ok(Ok(extraction)),
            Err(e) if e.is_empty_result() => Ok(Err(e)),
            Err(e) => Err(e.into()),
        }
    }
}

fn list(corpus: PathBuf) -> anyhow::Result<()> {
    let corpus = PreprintCorpus::open(corpus)?;
    let stdout = std::io::stdout();
    let mut w = stdout.lock();
    for id in corpus.ids() {
        writeln!(w, "{}", id)?;
    }
    Ok(())
}

fn extract(
    source: SourceArgs,
    models: ModelArgs,
    json: bool,
    output: Option<PathBuf>,
    color: ColorMode,
) -> anyhow::Result<()> {
    let (name, text) = read_source(&source)?;
    let pipeline = Pipeline::resolve(models)?;
    let result = pipeline.extract(&text)?;

    // Files never get escape codes
    let color = if output.is_some() { ColorMode(false) } else { color };
    let mut w: Box<dyn Write> = match output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout()),
    };

    if json {
        let document = match &result {
            Ok(extraction) => extraction.document(),
            Err(_) => Document::empty(),
        };
        writeln!(w, "{}", serde_json::to_string_pretty(&document)?)?;
        return Ok(());
    }

    match result {
        Ok(extraction) => output::print_extraction(&mut *w, &name, &extraction, color)?,
        Err(e) => output::print_no_affiliations(&mut *w, &name, &e.to_string(), color)?,
    }
    Ok(())
}

fn blocks(source: SourceArgs, models: ModelArgs, color: ColorMode) -> anyhow::Result<()> {
    let (name, text) = read_source(&source)?;
    let pipeline = Pipeline::resolve(models)?;
    let (classifier, tagger) = pipeline.endpoints.connect()?;
    let models = Models::new(&classifier, &tagger);

    let normalized = pipeline.extractor.normalize_text(&text);
    let pages = pipeline.extractor.analyze_blocks(&normalized, models)?;

    let stdout = std::io::stdout();
    let mut w = stdout.lock();
    output::print_heatmap(&mut w, &pages, color)?;
    match pipeline.extractor.select_region(&pages) {
        Ok(region) => output::print_block_breakdown(&mut w, &pages, &region.pages, color)?,
        Err(e) => output::print_no_affiliations(&mut w, &name, &e.to_string(), color)?,
    }
    Ok(())
}

fn graph(source: SourceArgs, models: ModelArgs, json: bool, color: ColorMode) -> anyhow::Result<()> {
    let (name, text) = read_source(&source)?;
    let pipeline = Pipeline::resolve(models)?;

    let stdout = std::io::stdout();
    let mut w = stdout.lock();
    match pipeline.extract(&text)? {
        Ok(extraction) if json => {
            writeln!(w, "{}", serde_json::to_string_pretty(&extraction.graph.export())?)?;
        }
        Ok(extraction) => output::print_graph(&mut w, &extraction.graph, color)?,
        Err(e) => output::print_no_affiliations(&mut w, &name, &e.to_string(), color)?,
    }
    Ok(())
}
