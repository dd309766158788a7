//! # rose-glass-runtime
//!
//! Runs the Rose Glass pipeline end to end: extraction, lens reading,
//! grief event registration and classification, and narrative rendering.
//!
//! ## Features
//!
//! - **Translator**: One call per reflection, configured once at build time
//! - **Runtime config**: YAML/JSON settings with defaults for every section
//! - **Event journals**: Replay recorded grief events and reflections into a tracker
//! - **Reading tracking**: Per-subject accumulation trends
//!
//! ## Example
//!
//! ```rust,ignore
//! use rose_glass_core::LensKind;
//! use rose_glass_runtime::{RuntimeConfig, TranslationRequest, Translator};
//!
//! let config = RuntimeConfig::from_path("runtime.yaml")?;
//! let translator = Translator::builder().config(config).build()?;
//!
//! let outcome = translator.translate(
//!     TranslationRequest::new("dr_a", "We lost him tonight.")
//!         .lens(LensKind::ProtectivePresence),
//! )?;
//! println!("{}", outcome.narrative);
//! ```

pub mod config;
pub mod journal;
pub mod translator;

pub use config::{ConfigError, DeterminismConfig, RuntimeConfig, TrackingConfig};
pub use journal::{EventJournal, JournalEntry, JournalError, JournalLoad, JournalReflection};
pub use translator::{
    NewGriefEvent, TranslateError, TranslationOutcome, TranslationRequest, Translator,
    TranslatorBuilder,
};
