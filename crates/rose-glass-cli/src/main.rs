//! Rose Glass CLI
//!
//! Command-line interface for reflection translation and wisdom pathways.
//!
//! ## Usage
//!
//! ```bash
//! # Translate a reflection through a lens
//! rose-glass translate --calibration calibration/example.yaml --input reflection.txt \
//!     --lens protective-presence
//!
//! # Pipe from stdin, registering a grief event for the subject
//! cat reflection.txt | rose-glass translate --calibration calibration/example.yaml \
//!     --subject dr_a --category pediatric --depth 0.8 --intensity 0.9 --circumstance prolonged
//!
//! # Suggest a pathway for a recorded event
//! rose-glass pathway --calibration calibration/example.yaml --events demos/events.yaml \
//!     --subject dr_a --event p1
//!
//! # Record a reflection on an event and see what wisdom it carries
//! rose-glass reflect --calibration calibration/example.yaml --events demos/events.yaml \
//!     --subject dr_a --event p2 --pathway compassion --input reflection.txt
//!
//! # Communication guidance for a family conversation
//! rose-glass guidance --calibration calibration/example.yaml --culture hindu_indian \
//!     --context imminent-death
//!
//! # Validate a calibration
//! rose-glass calibration validate calibration/example.yaml
//! ```
//!
//! ## Exit Codes
//!
//! - 0: Success
//! - 1: Validation failure
//! - 3: Error

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use rose_glass_core::lenses::{CommunicationContext, CommunicationGuidance, LensSet};
use rose_glass_core::{
    Calibration, GriefWisdomTracker, LensKind, ReflectionOutcome, SubjectId, TimeRange,
};
use rose_glass_runtime::{
    EventJournal, NewGriefEvent, RuntimeConfig, TranslationOutcome, TranslationRequest,
    Translator,
};

/// Rose Glass: pattern translation and grief wisdom pathways for physicians
#[derive(Parser)]
#[command(name = "rose-glass")]
#[command(version)]
#[command(about = "Read physician reflections through a lens and suggest wisdom pathways", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a reflection through a lens
    Translate {
        /// Path to the reflection text (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Runtime config file (YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Calibration file; overrides the runtime config
        #[arg(short, long)]
        calibration: Option<PathBuf>,

        /// Lens to read through; defaults to the runtime config's lens
        #[arg(short, long, value_parser = parse_lens)]
        lens: Option<LensKind>,

        /// Clinical context selecting the decay half-life
        #[arg(long)]
        context: Option<String>,

        /// Context tag (can be specified multiple times), e.g. culture:hindu_indian
        #[arg(short, long)]
        tag: Vec<String>,

        /// Subject the reflection belongs to
        #[arg(short, long, default_value = "default")]
        subject: String,

        /// Event journal to load before translating
        #[arg(long)]
        events: Option<PathBuf>,

        /// Register a grief event with this subject category
        #[arg(long, requires_all = ["depth", "intensity"])]
        category: Option<String>,

        /// Relationship depth of the grief event (0.0..=1.0)
        #[arg(long, requires = "category")]
        depth: Option<f64>,

        /// Initial intensity of the grief event (0.0..=1.0)
        #[arg(long, requires = "category")]
        intensity: Option<f64>,

        /// Circumstance tag of the grief event (can be specified multiple times)
        #[arg(long, requires = "category")]
        circumstance: Vec<String>,

        /// Id for the grief event; generated if omitted
        #[arg(long, requires = "category")]
        event_id: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Explicit timestamp for deterministic translation (ISO 8601 / RFC 3339).
        /// Example: --evaluated-at 2025-12-20T00:00:00Z
        #[arg(long, value_parser = parse_datetime)]
        evaluated_at: Option<DateTime<Utc>>,
    },

    /// Suggest a wisdom pathway for a recorded grief event
    Pathway {
        #[command(flatten)]
        tracker: TrackerArgs,

        /// Id of the focal event
        #[arg(short, long)]
        event: String,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List a subject's grief events
    History {
        #[command(flatten)]
        tracker: TrackerArgs,

        /// Earliest timestamp to include
        #[arg(long, value_parser = parse_datetime)]
        since: Option<DateTime<Utc>>,

        /// Latest timestamp to include
        #[arg(long, value_parser = parse_datetime)]
        until: Option<DateTime<Utc>>,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Decayed grief load for a subject
    Load {
        #[command(flatten)]
        tracker: TrackerArgs,

        /// Reference time (defaults to now)
        #[arg(long, value_parser = parse_datetime)]
        as_of: Option<DateTime<Utc>>,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Events most ready for transformation work
    Candidates {
        #[command(flatten)]
        tracker: TrackerArgs,

        /// Maximum number of candidates
        #[arg(short, long, default_value_t = 3)]
        max: usize,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Reflect on a recorded event along one pathway
    Reflect {
        #[command(flatten)]
        tracker: TrackerArgs,

        /// Id of the event reflected on
        #[arg(short, long)]
        event: String,

        /// Pathway id the reflection follows
        #[arg(short, long)]
        pathway: String,

        /// Path to the reflection text (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Time of the reflection (defaults to now)
        #[arg(long, value_parser = parse_datetime)]
        at: Option<DateTime<Utc>>,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Wisdom recorded for a subject, by pathway
    Wisdom {
        #[command(flatten)]
        tracker: TrackerArgs,

        /// Only list fragments that speak to others
        #[arg(long)]
        shareable: bool,

        /// Reference time for the compression ratio (defaults to now)
        #[arg(long, value_parser = parse_datetime)]
        as_of: Option<DateTime<Utc>>,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Communication guidance for a conversation with a family
    Guidance {
        /// Calibration file holding the cultural profiles
        #[arg(short, long)]
        calibration: PathBuf,

        /// Cultural profile key; generic guidance when absent or unknown
        #[arg(long)]
        culture: Option<String>,

        /// prognosis, goals-of-care or imminent-death
        #[arg(long, value_parser = parse_communication_context)]
        context: CommunicationContext,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Calibration management commands
    Calibration {
        #[command(subcommand)]
        action: CalibrationAction,
    },
}

#[derive(Args)]
struct TrackerArgs {
    /// Calibration file (YAML or JSON)
    #[arg(short, long)]
    calibration: PathBuf,

    /// Event journal (YAML or JSON)
    #[arg(long)]
    events: PathBuf,

    /// Subject to query
    #[arg(short, long)]
    subject: String,

    /// Clinical context selecting the decay half-life
    #[arg(long, default_value = "general_oncology")]
    context: String,
}

#[derive(Subcommand)]
enum CalibrationAction {
    /// Validate a calibration file
    Validate {
        /// Path to the calibration file
        path: PathBuf,
    },

    /// Show calibration details
    Show {
        /// Path to the calibration file
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Parse ISO 8601 / RFC 3339 datetime string to DateTime<Utc>.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Invalid datetime format: {}. Expected ISO 8601/RFC 3339 (e.g., 2025-12-20T00:00:00Z)", e))
}

fn parse_lens(s: &str) -> Result<LensKind, String> {
    s.parse().map_err(|e: rose_glass_core::UnknownLens| e.to_string())
}

fn parse_communication_context(s: &str) -> Result<CommunicationContext, String> {
    s.parse()
        .map_err(|e: rose_glass_core::lenses::UnknownCommunicationContext| e.to_string())
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(3)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Translate {
            input,
            config,
            calibration,
            lens,
            context,
            tag,
            subject,
            events,
            category,
            depth,
            intensity,
            circumstance,
            event_id,
            format,
            evaluated_at,
        } => {
            let mut runtime = match config {
                Some(path) => RuntimeConfig::from_path(&path)
                    .with_context(|| format!("Failed to load runtime config from {:?}", path))?,
                None => RuntimeConfig::default(),
            };
            if calibration.is_some() {
                runtime.calibration_path = calibration;
            }
            if let Some(context) = context {
                runtime.context = context;
            }
            if evaluated_at.is_some() {
                runtime.determinism.evaluated_at = evaluated_at;
            }

            let grief_event = match (category, depth, intensity) {
                (Some(subject_category), Some(relationship_depth), Some(initial_intensity)) => {
                    Some(NewGriefEvent {
                        id: event_id.map(Into::into),
                        subject_category,
                        relationship_depth,
                        initial_intensity,
                        circumstances: circumstance.into_iter().collect(),
                    })
                }
                _ => None,
            };

            let request = TranslationRequest {
                subject: subject.into(),
                text: read_input(input)?,
                lens,
                tags: tag.into_iter().collect::<BTreeSet<_>>(),
                grief_event,
            };
            translate_command(runtime, events, request, format)
        }

        Commands::Pathway {
            tracker,
            event,
            format,
        } => {
            let subject = SubjectId::from(tracker.subject.as_str());
            let tracker = load_tracker(&tracker)?;
            let suggestion = tracker
                .suggest_pathway(&subject, &event.as_str().into())
                .context("Pathway suggestion failed")?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&suggestion)?),
                OutputFormat::Text => {
                    println!("PATHWAY: {} ({})", suggestion.pathway.label, suggestion.pathway.id);
                    println!();
                    println!("Bucket: {}", suggestion.bucket);
                    println!(
                        "Load: {:.3} from {} earlier event(s)",
                        suggestion.load_score, suggestion.contributing_events
                    );
                    println!("Severity: {:.3}", suggestion.focal_severity);
                    println!();
                    println!("Prompts:");
                    for (i, prompt) in suggestion.prompts.iter().enumerate() {
                        println!("  {}. {}", i + 1, prompt);
                    }
                }
            }
            Ok(ExitCode::from(0))
        }

        Commands::History {
            tracker,
            since,
            until,
            format,
        } => {
            let subject = SubjectId::from(tracker.subject.as_str());
            let tracker = load_tracker(&tracker)?;
            let history = tracker.get_history(&subject, TimeRange { since, until });

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(history.as_slice())?)
                }
                OutputFormat::Text => {
                    if history.is_empty() {
                        println!("No events for {} in this window", subject);
                    }
                    for event in &history {
                        let circumstances = event
                            .circumstances
                            .iter()
                            .cloned()
                            .collect::<Vec<_>>()
                            .join(", ");
                        println!(
                            "{}  {:<12} {:<10} depth {:.2}  intensity {:.2}  {:<11} [{}]",
                            event.timestamp.to_rfc3339(),
                            event.event_id.as_str(),
                            event.subject_category,
                            event.relationship_depth,
                            event.initial_intensity,
                            event.processing_state().as_str(),
                            circumstances
                        );
                    }
                }
            }
            Ok(ExitCode::from(0))
        }

        Commands::Load {
            tracker,
            as_of,
            format,
        } => {
            let subject = SubjectId::from(tracker.subject.as_str());
            let tracker = load_tracker(&tracker)?;
            let as_of = as_of.unwrap_or_else(Utc::now);
            let load = tracker.load_score(&subject, as_of);

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&load)?),
                OutputFormat::Text => {
                    println!("Load for {} as of {}: {:.3}", subject, as_of.to_rfc3339(), load.value);
                    println!("Contributing events: {}", load.contributing_events);
                }
            }
            Ok(ExitCode::from(0))
        }

        Commands::Candidates {
            tracker,
            max,
            format,
        } => {
            let subject = SubjectId::from(tracker.subject.as_str());
            let tracker = load_tracker(&tracker)?;
            let candidates = tracker.transformation_candidates(&subject, max);

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&candidates)?),
                OutputFormat::Text => {
                    if candidates.is_empty() {
                        println!("No events awaiting transformation for {}", subject);
                    }
                    for (i, candidate) in candidates.iter().enumerate() {
                        println!(
                            "{}. {} ({}, {}) readiness {:.2}",
                            i + 1,
                            candidate.event.event_id,
                            candidate.event.subject_category,
                            candidate.event.processing_state(),
                            candidate.readiness
                        );
                    }
                }
            }
            Ok(ExitCode::from(0))
        }

        Commands::Reflect {
            tracker,
            event,
            pathway,
            input,
            at,
            format,
        } => {
            let subject = SubjectId::from(tracker.subject.as_str());
            let tracker = load_tracker(&tracker)?;
            let text = read_input(input)?;
            let outcome = tracker
                .process_reflection(
                    &subject,
                    &event.as_str().into(),
                    &pathway,
                    &text,
                    at.unwrap_or_else(Utc::now),
                )
                .context("Reflection failed")?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
                OutputFormat::Text => print_reflection(&outcome),
            }
            Ok(ExitCode::from(0))
        }

        Commands::Wisdom {
            tracker,
            shareable,
            as_of,
            format,
        } => {
            let subject = SubjectId::from(tracker.subject.as_str());
            let tracker = load_tracker(&tracker)?;
            let as_of = as_of.unwrap_or_else(Utc::now);

            let mut inventory = tracker.wisdom_inventory(&subject);
            if shareable {
                for fragments in inventory.values_mut() {
                    fragments.retain(|f| f.shareable);
                }
            }
            let rho = tracker.current_rho(&subject);
            let compression = tracker.compression_ratio(&subject, as_of);

            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "subject": subject,
                        "rho": rho,
                        "compression_ratio": compression,
                        "inventory": inventory,
                    }))?
                ),
                OutputFormat::Text => {
                    println!("Wisdom for {}", subject);
                    println!("  Accumulated (rho): {:.3}", rho);
                    println!("  Compression ratio: {:.3}", compression);
                    for (pathway, fragments) in &inventory {
                        println!();
                        println!("{} ({})", pathway, fragments.len());
                        for fragment in fragments {
                            println!(
                                "  {} [{}] {} (accessibility {:.2}{})",
                                fragment.extracted_at.to_rfc3339(),
                                fragment.source_event,
                                fragment.insight,
                                fragment.accessibility,
                                if fragment.shareable { ", shareable" } else { "" }
                            );
                        }
                    }
                }
            }
            Ok(ExitCode::from(0))
        }

        Commands::Guidance {
            calibration,
            culture,
            context,
            format,
        } => {
            let calibration = Calibration::from_path(&calibration)
                .with_context(|| format!("Failed to load calibration from {:?}", calibration))?;
            let guidance = LensSet::from_calibration(&calibration)
                .cultural()
                .communication_guidance(culture.as_deref(), context);

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&guidance)?),
                OutputFormat::Text => print_guidance(context, &guidance),
            }
            Ok(ExitCode::from(0))
        }

        Commands::Calibration { action } => match action {
            CalibrationAction::Validate { path } => validate_calibration(path),
            CalibrationAction::Show { path } => show_calibration(path),
        },
    }
}

fn read_input(path: Option<PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read reflection from {:?}", path)),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read from stdin")?;
            Ok(buffer)
        }
    }
}

fn load_tracker(args: &TrackerArgs) -> Result<GriefWisdomTracker> {
    let calibration = Calibration::from_path(&args.calibration)
        .with_context(|| format!("Failed to load calibration from {:?}", args.calibration))?;
    let tracker = GriefWisdomTracker::new(calibration, args.context.as_str())
        .context("Failed to build tracker")?;

    EventJournal::from_path(&args.events)
        .with_context(|| format!("Failed to load events from {:?}", args.events))?
        .load_into_tracker(&tracker)
        .context("Failed to register events")?;
    Ok(tracker)
}

fn translate_command(
    config: RuntimeConfig,
    events: Option<PathBuf>,
    request: TranslationRequest,
    format: OutputFormat,
) -> Result<ExitCode> {
    let translator = Translator::builder()
        .config(config)
        .build()
        .context("Failed to build translator")?;

    if let Some(path) = events {
        EventJournal::from_path(&path)
            .with_context(|| format!("Failed to load events from {:?}", path))?
            .load_into_tracker(translator.tracker())
            .context("Failed to register events")?;
    }

    let outcome = translator
        .translate(request)
        .context("Translation failed")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => print_text_outcome(&outcome),
    }
    Ok(ExitCode::from(0))
}

fn print_text_outcome(outcome: &TranslationOutcome) {
    print!("{}", outcome.narrative);

    if let Some(trend) = &outcome.trend {
        println!();
        println!("TREND (last {} readings):", trend.sample_size);
        println!("  Wisdom: {}", trend.wisdom.as_str());
        println!("  Engagement: {}", trend.engagement.as_str());
        println!("  Connection: {}", trend.connection.as_str());
        println!("  {}", trend.note);
    }
}

fn print_reflection(outcome: &ReflectionOutcome) {
    println!(
        "REFLECTION: {} on {} ({})",
        outcome.pathway.label,
        outcome.event_id,
        outcome.processing_state
    );
    println!();
    match &outcome.fragment {
        Some(fragment) => {
            println!("Wisdom: {}", fragment.insight);
            println!(
                "  accessibility {:.2}, {} marker(s){}",
                fragment.accessibility,
                fragment.marker_count,
                if fragment.shareable { ", shareable" } else { "" }
            );
        }
        None => println!("No wisdom fragment recorded from this reflection"),
    }
    println!();
    println!("Accumulated wisdom (rho): {:.3}", outcome.rho);
    println!("Compression ratio: {:.3}", outcome.compression_ratio);
    println!("Remaining load: {:.3}", outcome.remaining_load);
    println!();
    for note in &outcome.reflections {
        println!("{}", note);
    }
    println!();
    println!("Next steps:");
    for step in &outcome.next_steps {
        println!("  - {}", step);
    }
}

fn print_guidance(context: CommunicationContext, guidance: &CommunicationGuidance) {
    println!("GUIDANCE: {}", context);
    for (heading, items) in [
        ("Cultural awareness", &guidance.cultural_awareness),
        ("Suggested approach", &guidance.suggested_approach),
        ("Suggested language", &guidance.suggested_language),
        ("Cautions", &guidance.cautions),
        ("Questions to ask the family", &guidance.questions_to_ask_family),
        ("Ritual considerations", &guidance.ritual_considerations),
    ] {
        if items.is_empty() {
            continue;
        }
        println!();
        println!("{}:", heading);
        for item in items {
            println!("  - {}", item);
        }
    }
    println!();
    println!("{}", guidance.critical_reminder);
}

fn validate_calibration(path: PathBuf) -> Result<ExitCode> {
    match Calibration::from_path(&path) {
        Ok(c) => {
            println!("Calibration is valid: {}", c.name);
            println!();
            println!("Version: {}", c.calibration_version);
            println!("Contexts: {}", c.decay.half_lives.len());
            println!("Pathways: {}", c.pathways.len());
            println!("Rules: {}", c.rules.len());
            Ok(ExitCode::from(0))
        }
        Err(e) => {
            eprintln!("Calibration validation failed: {}", e);
            Ok(ExitCode::from(1))
        }
    }
}

fn show_calibration(path: PathBuf) -> Result<ExitCode> {
    let calibration = Calibration::from_path(&path)
        .with_context(|| format!("Failed to load calibration from {:?}", path))?;

    println!("Calibration: {}", calibration.name);
    println!("Version: {}", calibration.calibration_version);
    if let Some(description) = &calibration.description {
        println!("Description: {}", description);
    }
    println!();

    println!("Half-lives:");
    for (context, half_life) in &calibration.decay.half_lives {
        println!("  {}: {:.1} days", context, half_life.as_secs_f64() / 86_400.0);
    }
    println!();

    println!("Severity:");
    println!("  Intensity weight: {}", calibration.severity.intensity_weight);
    println!("  Depth weight: {}", calibration.severity.depth_weight);
    for (tag, multiplier) in &calibration.severity.circumstance_multipliers {
        println!("  x{} when {}", multiplier, tag);
    }
    println!();

    println!("Pathways (highest priority first):");
    for (i, pathway) in calibration.pathways.iter().enumerate() {
        println!("  {}. {} ({} prompts)", i + 1, pathway.label, pathway.prompts.len());
    }
    println!();

    println!("Rules:");
    for rule in &calibration.rules {
        println!("  {} -> {}", rule.display_label(), rule.pathway);
    }

    if !calibration.cultural_profiles.is_empty() {
        println!();
        println!("Cultural profiles:");
        for (key, profile) in &calibration.cultural_profiles {
            println!("  {}: {}", key, profile.tradition);
        }
    }

    Ok(ExitCode::from(0))
}
