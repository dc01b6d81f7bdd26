use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use postal_distance::{
    ActionOutcome, AddressBackend, AddressSource, DEPOTS, DeliveryPlanner, Diagnostic,
    Geocoder, GeocoderConfig, PlanOutcome, PositionStack, RawAddress, SelectionPolicy, Session,
    TesseractOcr, Visualization, Visualizer, default_output_dir, normalize_action, parse_action,
};

/// Parse, normalize and geocode postal addresses, and map delivery distances.
#[derive(Debug, Parser)]
#[command(name = "postal-distance", version, about)]
struct Cli {
    /// Log filter, e.g. "debug" or "postal_distance=trace" (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Split an address into labeled components
    Parse(InputArgs),
    /// List normalized variants of an address
    Normalize(InputArgs),
    /// Look up coordinates for one or more addresses
    Geocode {
        /// Addresses to look up
        #[arg(required = true)]
        addresses: Vec<String>,
        #[command(flatten)]
        geo: GeoArgs,
    },
    /// Normalize an address and map its distance from a depot
    Distance {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        geo: GeoArgs,
        #[command(flatten)]
        plan: PlanArgs,
    },
    /// List the candidate depot addresses
    Depots,
    /// Interactive session that remembers the last normalization
    Shell {
        #[command(flatten)]
        geo: GeoArgs,
        #[command(flatten)]
        plan: PlanArgs,
        /// Tesseract language pack for `image` commands
        #[arg(long, default_value = "eng")]
        ocr_lang: String,
    },
}

#[derive(Debug, Args)]
struct InputArgs {
    /// Address text
    #[arg(long, conflicts_with = "image", required_unless_present = "image")]
    text: Option<String>,
    /// PNG or JPEG image to run OCR over
    #[arg(long)]
    image: Option<PathBuf>,
    /// Tesseract language pack
    #[arg(long, default_value = "eng")]
    ocr_lang: String,
}

#[derive(Debug, Args)]
struct GeoArgs {
    /// positionstack access key (default: $POSITIONSTACK_API_KEY)
    #[arg(long)]
    api_key: Option<String>,
    /// Country restriction (default: IN)
    #[arg(long)]
    country: Option<String>,
    /// Required region substring; pass "" to accept any region
    #[arg(long)]
    region: Option<String>,
    /// Lookups allowed in flight at once
    #[arg(long)]
    max_in_flight: Option<usize>,
}

#[derive(Debug, Args)]
struct PlanArgs {
    /// Depot number from `depots`, or a full address
    #[arg(long, default_value = "1")]
    depot: String,
    /// Which normalized variant to measure to
    #[arg(long, value_enum, default_value_t = Pick::First)]
    pick: Pick,
    /// Where to write the map (default: <cache dir>/postal-distance/distance_map.html)
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Pick {
    First,
    Shortest,
}

impl From<Pick> for SelectionPolicy {
    fn from(pick: Pick) -> Self {
        match pick {
            Pick::First => SelectionPolicy::First,
            Pick::Shortest => SelectionPolicy::Shortest,
        }
    }
}

impl InputArgs {
    fn source(&self) -> AddressSource {
        match (&self.text, &self.image) {
            (_, Some(path)) => AddressSource::Image(path.clone()),
            (Some(text), None) => AddressSource::Manual(text.clone()),
            (None, None) => AddressSource::Manual(String::new()),
        }
    }
}

impl GeoArgs {
    fn config(&self) -> Result<GeocoderConfig> {
        let mut builder = GeocoderConfig::builder().env(|key| std::env::var(key).ok())?;
        if let Some(key) = &self.api_key {
            builder = builder.api_key(key.clone());
        }
        if let Some(country) = &self.country {
            builder = builder.country(country.clone());
        }
        if let Some(region) = &self.region {
            builder = builder.expected_region(Some(region.clone()));
        }
        if let Some(n) = self.max_in_flight {
            builder = builder.max_in_flight(n);
        }
        Ok(builder.build()?)
    }

    fn planner(&self, plan: &PlanArgs) -> Result<DeliveryPlanner<PositionStack>> {
        let config = self.config()?;
        let geocoder = Geocoder::from_config(PositionStack::new(config.clone())?, &config);
        Ok(DeliveryPlanner::new(geocoder, Visualizer::new()).with_policy(plan.pick.into()))
    }
}

/// A depot number from the list, or a free-form depot address.
fn depot_address(choice: &str) -> Result<String> {
    match choice.trim().parse::<i64>() {
        Ok(n) => usize::try_from(n)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| DEPOTS.get(i))
            .map(|depot| depot.to_string())
            .with_context(|| format!("no depot {n}; choose 1 to {}", DEPOTS.len())),
        Err(_) if choice.trim().is_empty() => anyhow::bail!("depot address is empty"),
        Err(_) => Ok(choice.to_string()),
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "postal_distance=info".into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(feature = "libpostal")]
async fn address_backend() -> Box<dyn AddressBackend> {
    match postal_distance::LibpostalBackend::initialize().await {
        Ok(backend) => Box::new(backend),
        Err(e) => {
            tracing::error!(error = %e, "libpostal unavailable");
            Box::new(postal_distance::UnavailableBackend)
        }
    }
}

#[cfg(not(feature = "libpostal"))]
async fn address_backend() -> Box<dyn AddressBackend> {
    Box::new(postal_distance::UnavailableBackend)
}

/// Tracks whether anything reported at error level.
#[derive(Default)]
struct Report {
    failed: bool,
}

impl Report {
    fn diagnostic(&mut self, diagnostic: &Diagnostic) {
        self.failed |= diagnostic.is_error();
        println!("{diagnostic}");
    }

    fn action(&mut self, outcome: &ActionOutcome) {
        match outcome {
            ActionOutcome::Skipped => {}
            ActionOutcome::Output { heading, lines } => {
                if let Some(heading) = heading {
                    println!("{heading}");
                }
                for line in lines {
                    println!("{line}");
                }
            }
            ActionOutcome::Failed(diagnostic) => self.diagnostic(diagnostic),
        }
    }

    fn exit_code(&self) -> ExitCode {
        if self.failed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

fn resolve_source(source: &AddressSource, ocr: &TesseractOcr, report: &mut Report) -> RawAddress {
    match source.resolve(ocr) {
        Ok(raw) => {
            if matches!(source, AddressSource::Image(_)) {
                println!("Extracted Address:");
                println!("{raw}");
            }
            raw
        }
        Err(e) => {
            report.diagnostic(&Diagnostic::collaborator_fault("Reading the address", e));
            RawAddress::default()
        }
    }
}

async fn write_map(viz: &Visualization, out: &Path, report: &mut Report) -> Result<()> {
    let html = match viz.map.to_html() {
        Ok(html) => html,
        Err(e) => {
            report.diagnostic(&Diagnostic::collaborator_fault("Rendering the map", e));
            return Ok(());
        }
    };
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    tokio::fs::write(out, html)
        .await
        .with_context(|| format!("writing {}", out.display()))?;
    println!("Distance: {}", viz.distance_label());
    println!("Map written to {}", out.display());
    Ok(())
}

async fn run_plan(
    planner: &DeliveryPlanner<PositionStack>,
    session: &Session,
    depot: &str,
    out: &Path,
    report: &mut Report,
) -> Result<()> {
    match planner.plan(session, depot).await {
        PlanOutcome::Skipped => {
            println!("Normalize an address first.");
        }
        PlanOutcome::Completed {
            diagnostics,
            visualization,
        } => {
            for diagnostic in &diagnostics {
                report.diagnostic(diagnostic);
            }
            if let Some(viz) = visualization {
                write_map(&viz, out, report).await?;
            }
        }
    }
    Ok(())
}

fn map_path(plan: &PlanArgs) -> PathBuf {
    plan.out
        .clone()
        .unwrap_or_else(|| default_output_dir().join("distance_map.html"))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let mut report = Report::default();
    match cli.command {
        Command::Parse(input) => {
            let ocr = TesseractOcr::new().with_language(&input.ocr_lang);
            let raw = resolve_source(&input.source(), &ocr, &mut report);
            let backend = address_backend().await;
            report.action(&parse_action(backend.as_ref(), &raw));
        }
        Command::Normalize(input) => {
            let ocr = TesseractOcr::new().with_language(&input.ocr_lang);
            let raw = resolve_source(&input.source(), &ocr, &mut report);
            let backend = address_backend().await;
            let mut session = Session::new();
            report.action(&normalize_action(backend.as_ref(), &mut session, &raw));
        }
        Command::Geocode { addresses, geo } => {
            let config = geo.config()?;
            let geocoder = Geocoder::from_config(PositionStack::new(config.clone())?, &config);
            let outcome = geocoder.geocode(&addresses).await;
            for diagnostic in &outcome.diagnostics {
                report.diagnostic(diagnostic);
            }
        }
        Command::Distance { input, geo, plan } => {
            let planner = geo.planner(&plan)?;
            let ocr = TesseractOcr::new().with_language(&input.ocr_lang);
            let raw = resolve_source(&input.source(), &ocr, &mut report);
            let backend = address_backend().await;
            let mut session = Session::new();
            report.action(&normalize_action(backend.as_ref(), &mut session, &raw));
            run_plan(
                &planner,
                &session,
                &depot_address(&plan.depot)?,
                &map_path(&plan),
                &mut report,
            )
            .await?;
        }
        Command::Depots => {
            for (i, depot) in DEPOTS.iter().enumerate() {
                println!("{}. {depot}", i + 1);
            }
        }
        Command::Shell {
            geo,
            plan,
            ocr_lang,
        } => {
            let planner = geo.planner(&plan)?;
            let ocr = TesseractOcr::new().with_language(ocr_lang);
            let backend = address_backend().await;
            shell(&planner, backend.as_ref(), &ocr, &plan).await?;
        }
    }

    Ok(report.exit_code())
}

const SHELL_HELP: &str = "\
commands:
  text <address>     use typed address text
  image <path>       run OCR over a PNG/JPEG image
  parse              show labeled components
  normalize          list normalized variants and remember them
  depot <n|address>  choose the depot (see `depots` for numbers)
  depots             list depots
  distance [file]    geocode depot + first variant and write the map
  help               show this help
  quit               leave the session";

async fn shell(
    planner: &DeliveryPlanner<PositionStack>,
    backend: &dyn AddressBackend,
    ocr: &TesseractOcr,
    plan: &PlanArgs,
) -> Result<()> {
    let mut session = Session::new();
    let mut raw = RawAddress::default();
    let mut depot = depot_address(&plan.depot)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{SHELL_HELP}");
    while let Some(line) = lines.next_line().await? {
        let mut report = Report::default();
        let (command, rest) = line
            .trim()
            .split_once(char::is_whitespace)
            .map(|(c, r)| (c, r.trim()))
            .unwrap_or((line.trim(), ""));

        match command {
            "" => {}
            "text" => raw = RawAddress::new(rest),
            "image" => {
                raw = resolve_source(&AddressSource::Image(PathBuf::from(rest)), ocr, &mut report)
            }
            "parse" => report.action(&parse_action(backend, &raw)),
            "normalize" => report.action(&normalize_action(backend, &mut session, &raw)),
            "depot" => match depot_address(rest) {
                Ok(choice) => {
                    depot = choice;
                    println!("Depot: {depot}");
                }
                Err(e) => println!("[error] {e:#}"),
            },
            "depots" => {
                for (i, d) in DEPOTS.iter().enumerate() {
                    println!("{}. {d}", i + 1);
                }
            }
            "distance" => {
                let out = if rest.is_empty() {
                    map_path(plan)
                } else {
                    PathBuf::from(rest)
                };
                if let Err(e) = run_plan(planner, &session, &depot, &out, &mut report).await {
                    println!("[error] {e:#}");
                }
            }
            "help" => println!("{SHELL_HELP}"),
            "quit" | "exit" => break,
            other => println!("unknown command {other:?}; try `help`"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depot_by_number() {
        assert_eq!(depot_address("2").unwrap(), DEPOTS[1]);
        assert_eq!(depot_address(" 3 ").unwrap(), DEPOTS[2]);
    }

    #[test]
    fn test_depot_number_out_of_range() {
        for choice in ["0", "4", "-1"] {
            let err = depot_address(choice).unwrap_err();
            assert!(err.to_string().contains("choose 1 to 3"), "{err}");
        }
        assert!(depot_address("  ").is_err());
    }

    #[test]
    fn test_depot_free_text() {
        assert_eq!(
            depot_address("Dwaraka Nagar, Visakhapatnam").unwrap(),
            "Dwaraka Nagar, Visakhapatnam"
        );
    }
}
