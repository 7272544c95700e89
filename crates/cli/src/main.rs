use std::path::PathBuf;
use std::process::ExitCode;

use annotation::{
    AnnotationDocument, AnnotatorConfig, AttributeSet, Command, HeadlessSurface,
    HydrationReport, NotchKind, OpaqueLabel, ParsedDocument, PlaybackHandle, ProvisionalBounds,
    RegionDraft, Result, RulerNotch, RulerStyle, Session, SurfaceEvent, TransportEvent,
    TransportObserver, notches,
};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "wavemark",
    about = "Inspect audio annotation documents and ruler layouts",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load an annotation document and report what it restores.
    Inspect(InspectArgs),

    /// Print ruler notches for a track length and zoom level.
    Ruler(RulerArgs),
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Annotation document (JSON array, or object with a `result` array).
    document: PathBuf,

    /// Annotator config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Track duration in seconds; regions are clamped to it.
    #[arg(long)]
    duration: Option<f64>,

    /// Write the normalized document here.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct RulerArgs {
    #[arg(long)]
    duration: f64,

    /// Horizontal density in pixels per second.
    #[arg(long, default_value_t = 230.0)]
    zoom: f64,

    /// Annotator config file providing the ruler colours.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Transport observer that only logs.
#[derive(Debug, Default)]
struct LogObserver;

impl TransportObserver for LogObserver {
    fn on_ready(&mut self, _handle: PlaybackHandle) {
        info!("surface ready");
    }

    fn on_transport_change(&mut self, event: TransportEvent) {
        info!(?event, "transport changed");
    }
}

/// Documents are only read here, never drawn on.
fn refuse_gestures(_: &ProvisionalBounds) -> Option<RegionDraft<OpaqueLabel>> {
    None
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Inspect(args) => run_inspect(args),
        Commands::Ruler(args) => run_ruler(&args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&PathBuf>) -> Result<AnnotatorConfig> {
    match path {
        Some(path) => AnnotatorConfig::load(path),
        None => Ok(AnnotatorConfig::default()),
    }
}

type Authorizer = fn(&ProvisionalBounds) -> Option<RegionDraft<OpaqueLabel>>;

type InspectSession = Session<OpaqueLabel, HeadlessSurface, Authorizer, LogObserver>;

/// Hydrates a headless session from `parsed`.
///
/// Rating controls are inferred from the document itself, so their values
/// are restored and written back out.
fn open_session(
    config: AnnotatorConfig,
    source: &str,
    parsed: &ParsedDocument,
    duration: Option<f64>,
) -> Result<(InspectSession, HydrationReport)> {
    let attributes = AttributeSet::infer_ratings(parsed.entries.iter().map(|(_, entry)| entry));
    let mut session: InspectSession = Session::new(
        config,
        HeadlessSurface::new(),
        refuse_gestures as Authorizer,
        LogObserver,
    )
    .with_attributes(attributes);
    session.handle_command(Command::Load {
        source: source.to_owned(),
    })?;
    if let Some(duration) = duration {
        session.handle_surface_event(SurfaceEvent::Ready { duration });
    }

    let report = session.import_parsed(parsed, |_| OpaqueLabel::default());
    Ok((session, report))
}

fn summarize(session: &InspectSession, report: &HydrationReport) -> Value {
    let regions: Vec<Value> = session
        .store()
        .iter()
        .map(|region| {
            json!({
                "id": region.persisted_id(),
                "from_name": region.payload().from_name,
                "type": region.payload().kind,
                "start": region.start(),
                "end": region.end(),
            })
        })
        .collect();
    let attributes: Vec<Value> = session
        .attributes()
        .iter()
        .map(|attribute| {
            json!({
                "name": attribute.name(),
                "value": attribute.value(),
                "max": attribute.max(),
                "icon_px": attribute.icon_size_px(),
            })
        })
        .collect();
    let skipped: Vec<Value> = report
        .skipped
        .iter()
        .map(|skip| json!({ "index": skip.index, "id": skip.id, "reason": skip.reason }))
        .collect();
    json!({
        "restored": report.restored,
        "regions": regions,
        "attributes": attributes,
        "skipped": skipped,
    })
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let parsed = AnnotationDocument::load(&args.document)?;

    let source = args.document.display().to_string();
    let (session, report) = open_session(config, &source, &parsed, args.duration)?;
    println!("{}", serde_json::to_string_pretty(&summarize(&session, &report))?);

    if let Some(output) = &args.output {
        session.export_document().save(output)?;
    }
    Ok(())
}

fn run_ruler(args: &RulerArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    for notch in notches(args.duration, args.zoom) {
        println!("{}", ruler_line(&notch, &config.ruler));
    }
    Ok(())
}

fn ruler_line(notch: &RulerNotch, style: &RulerStyle) -> String {
    let kind = match notch.kind {
        NotchKind::Primary => "primary",
        NotchKind::Secondary => "secondary",
        NotchKind::Plain => "plain",
    };
    let color = notch.kind.color(style);
    match (&notch.label, notch.kind.font_color(style)) {
        (Some(label), Some(font)) => format!(
            "{:>10.3}  {kind:<9}  {color:<8}  {label} ({font})",
            notch.seconds
        ),
        _ => format!("{:>10.3}  {kind:<9}  {color}", notch.seconds),
    }
}

#[cfg(test)]
mod tests {
    use annotation::{AnnotatorConfig, NotchKind, RulerStyle, notches};
    use clap::Parser;
    use serde_json::json;

    use super::{Cli, Commands, InspectArgs, ruler_line, run_inspect};

    fn scratch_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("wavemark-{}-{name}", std::process::id()))
    }

    #[test]
    fn parses_inspect_with_duration() {
        let cli = Cli::try_parse_from(["wavemark", "inspect", "doc.json", "--duration", "12.5"])
            .expect("valid arguments");

        match cli.command {
            Commands::Inspect(args) => {
                assert_eq!(args.document.to_str(), Some("doc.json"));
                assert_eq!(args.duration, Some(12.5));
                assert!(args.config.is_none());
            }
            Commands::Ruler(_) => panic!("expected inspect"),
        }
    }

    #[test]
    fn ruler_zoom_defaults() {
        let cli = Cli::try_parse_from(["wavemark", "ruler", "--duration", "3"])
            .expect("valid arguments");

        match cli.command {
            Commands::Ruler(args) => assert_eq!(args.zoom, 230.0),
            Commands::Inspect(_) => panic!("expected ruler"),
        }
    }

    #[test]
    fn inspect_output_keeps_document_ratings() {
        let input = scratch_path("rated-input.json");
        let output = scratch_path("rated-output.json");
        let document = json!([
            { "id": "r1", "from_name": "label", "to_name": "audio", "type": "labels",
              "value": { "start": 1.0, "end": 2.0, "labels": ["speech"] } },
            { "id": "q1", "from_name": "quality", "to_name": "audio", "type": "rating",
              "value": { "rating": 4 } }
        ]);
        std::fs::write(&input, document.to_string()).expect("input written");

        run_inspect(InspectArgs {
            document: input.clone(),
            config: None,
            duration: Some(10.0),
            output: Some(output.clone()),
        })
        .expect("inspect succeeds");

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).expect("output written"))
                .expect("output is JSON");
        let _ = std::fs::remove_file(&input);
        let _ = std::fs::remove_file(&output);
        let entries = written.as_array().expect("bare array");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["id"], json!("q1"));
        assert_eq!(entries[1]["from_name"], json!("quality"));
        assert_eq!(entries[1]["value"]["rating"], json!(4));
    }

    #[test]
    fn ruler_lines_carry_style_colours() {
        let style = RulerStyle {
            primary_color: "red".to_owned(),
            secondary_color: "gray".to_owned(),
            primary_font_color: "#111".to_owned(),
            secondary_font_color: "#222".to_owned(),
        };
        let primary = notches(2.0, 100.0)
            .find(|notch| notch.kind == NotchKind::Primary)
            .expect("track has a primary notch");
        let plain = notches(2.0, 100.0)
            .find(|notch| notch.kind == NotchKind::Plain)
            .expect("track has a plain notch");

        let line = ruler_line(&primary, &style);

        assert!(line.contains("primary"));
        assert!(line.contains("red"));
        assert!(line.ends_with("(#111)"));
        assert!(ruler_line(&plain, &style).ends_with("gray"));
        assert_eq!(AnnotatorConfig::default().ruler, RulerStyle::default());
    }
}
