//! # Per-call configuration and collaborators
//!
//! Two value objects travel with every expansion:
//!
//! - [`DynamicValueConfig`]: what kind of rendering this call is (mode, flags), how deep
//!   in a snippet chain it runs, and which live fields from the editing session should
//!   donate their user input. Immutable; nested calls derive a new value via
//!   [`DynamicValueConfig::nested`].
//! - [`ExpansionContext`]: the read-only bundle of collaborators the fields consult
//!   (snippet lookup, clipboard, device info, randomness, clock, limits). Built once per
//!   call tree and shared unchanged by every nested expansion.
//!
//! Nothing here holds global state. Everything a field needs comes in through these two
//! values.

use crate::error::Result;
use crate::fields::format::DEFAULT_DATE_FORMAT;
use crate::fields::{DeviceInfoKind, Field, RandomKind};
use crate::model::StoredNote;
use chrono::{DateTime, Local};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 3;

/// Finds stored notes referenced by snippet placeholders.
pub trait SnippetLookup: Send + Sync {
    fn find_by_id(&self, id: &str) -> Result<Option<StoredNote>>;
}

pub trait ClipboardAccessor: Send + Sync {
    fn current_text(&self) -> Result<Option<String>>;
}

pub trait DeviceInfoProvider: Send + Sync {
    fn value_for(&self, kind: DeviceInfoKind) -> String;
}

pub trait RandomValueProvider: Send + Sync {
    fn generate(&self, kind: RandomKind, options: &[String]) -> String;
}

pub trait AppLimits: Send + Sync {
    fn max_recursion_depth(&self) -> usize;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// How unresolved fields are rendered and which fields are resolved at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Form filling: missing values show the field label.
    #[default]
    Interactive,
    /// Read-only preview: user inputs always show their label.
    Preview,
    /// Editing the note itself: snippets show their label and are not expanded.
    Edit,
    /// Automatic expansion with no user in the loop: missing values become empty.
    Recursive,
    /// One-shot action (copy, share): missing values become empty.
    FastAction,
}

impl ProcessingMode {
    /// Whether a field without a value is rendered as its label.
    pub fn renders_labels(self) -> bool {
        matches!(
            self,
            ProcessingMode::Interactive | ProcessingMode::Preview | ProcessingMode::Edit
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingMode::Interactive => "interactive",
            ProcessingMode::Preview => "preview",
            ProcessingMode::Edit => "edit",
            ProcessingMode::Recursive => "recursive",
            ProcessingMode::FastAction => "fast",
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "interactive" => Ok(ProcessingMode::Interactive),
            "preview" => Ok(ProcessingMode::Preview),
            "edit" => Ok(ProcessingMode::Edit),
            "recursive" => Ok(ProcessingMode::Recursive),
            "fast" | "fast-action" => Ok(ProcessingMode::FastAction),
            _ => Err(format!("Unknown processing mode: {}", s)),
        }
    }
}

/// Immutable parameters of one `process` call.
#[derive(Debug, Clone)]
pub struct DynamicValueConfig {
    level: usize,
    mode: ProcessingMode,
    force_values: bool,
    passthrough: bool,
    initial_fields: Arc<[Field]>,
}

impl Default for DynamicValueConfig {
    fn default() -> Self {
        Self::new(ProcessingMode::default())
    }
}

impl DynamicValueConfig {
    pub fn new(mode: ProcessingMode) -> Self {
        Self {
            level: 0,
            mode,
            force_values: false,
            passthrough: false,
            initial_fields: Arc::from(Vec::new()),
        }
    }

    /// Live fields from the current editing session. Their user input is merged into
    /// freshly parsed fields with the same identity.
    pub fn with_initial_fields(mut self, fields: Vec<Field>) -> Self {
        self.initial_fields = Arc::from(fields);
        self
    }

    /// Always render values, never labels (used when the output feeds a QR code).
    pub fn with_force_values(mut self, force_values: bool) -> Self {
        self.force_values = force_values;
        self
    }

    /// Return text untouched (notes generated by the app itself).
    pub fn with_passthrough(mut self, passthrough: bool) -> Self {
        self.passthrough = passthrough;
        self
    }

    /// The config for expanding a snippet found at this level.
    pub fn nested(&self) -> Self {
        Self {
            level: self.level + 1,
            ..self.clone()
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    pub fn force_values(&self) -> bool {
        self.force_values
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    pub fn is_edit_mode(&self) -> bool {
        self.mode == ProcessingMode::Edit
    }

    pub fn is_preview_mode(&self) -> bool {
        self.mode == ProcessingMode::Preview
    }

    pub fn initial_fields(&self) -> &[Field] {
        &self.initial_fields
    }
}

/// Read-only collaborators shared by a whole expansion tree.
#[derive(Clone)]
pub struct ExpansionContext {
    snippets: Arc<dyn SnippetLookup>,
    clipboard: Arc<dyn ClipboardAccessor>,
    device: Arc<dyn DeviceInfoProvider>,
    random: Arc<dyn RandomValueProvider>,
    clock: Arc<dyn Clock>,
    limits: Arc<dyn AppLimits>,
    date_format: String,
}

impl Default for ExpansionContext {
    fn default() -> Self {
        Self {
            snippets: Arc::new(NoSnippets),
            clipboard: Arc::new(NoClipboard),
            device: Arc::new(SystemDeviceInfo),
            random: Arc::new(ThreadRandom),
            clock: Arc::new(SystemClock),
            limits: Arc::new(DepthLimit(DEFAULT_MAX_RECURSION_DEPTH)),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl fmt::Debug for ExpansionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpansionContext")
            .field("max_recursion_depth", &self.limits.max_recursion_depth())
            .field("date_format", &self.date_format)
            .finish_non_exhaustive()
    }
}

impl ExpansionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snippets(self, snippets: impl SnippetLookup + 'static) -> Self {
        self.with_shared_snippets(Arc::new(snippets))
    }

    pub fn with_shared_snippets(mut self, snippets: Arc<dyn SnippetLookup>) -> Self {
        self.snippets = snippets;
        self
    }

    pub fn with_clipboard(mut self, clipboard: impl ClipboardAccessor + 'static) -> Self {
        self.clipboard = Arc::new(clipboard);
        self
    }

    pub fn with_device_info(mut self, device: impl DeviceInfoProvider + 'static) -> Self {
        self.device = Arc::new(device);
        self
    }

    pub fn with_random(mut self, random: impl RandomValueProvider + 'static) -> Self {
        self.random = Arc::new(random);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_limits(mut self, limits: impl AppLimits + 'static) -> Self {
        self.limits = Arc::new(limits);
        self
    }

    /// Format for date fields without their own `format` attribute.
    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    pub fn snippets(&self) -> &dyn SnippetLookup {
        self.snippets.as_ref()
    }

    pub fn clipboard(&self) -> &dyn ClipboardAccessor {
        self.clipboard.as_ref()
    }

    pub fn device(&self) -> &dyn DeviceInfoProvider {
        self.device.as_ref()
    }

    pub fn random(&self) -> &dyn RandomValueProvider {
        self.random.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn limits(&self) -> &dyn AppLimits {
        self.limits.as_ref()
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }
}

// --- Default collaborators ---

#[derive(Debug, Clone, Copy, Default)]
pub struct NoSnippets;

impl SnippetLookup for NoSnippets {
    fn find_by_id(&self, _id: &str) -> Result<Option<StoredNote>> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoClipboard;

impl ClipboardAccessor for NoClipboard {
    fn current_text(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Clipboard with fixed contents.
#[derive(Debug, Clone, Default)]
pub struct StaticClipboard(pub Option<String>);

impl ClipboardAccessor for StaticClipboard {
    fn current_text(&self) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthLimit(pub usize);

impl AppLimits for DepthLimit {
    fn max_recursion_depth(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Device facts read from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDeviceInfo;

impl DeviceInfoProvider for SystemDeviceInfo {
    fn value_for(&self, kind: DeviceInfoKind) -> String {
        use std::env::consts;
        match kind {
            DeviceInfoKind::Platform => format!("{} ({})", consts::OS, consts::ARCH),
            DeviceInfoKind::Os => consts::OS.to_string(),
            DeviceInfoKind::Arch => consts::ARCH.to_string(),
            DeviceInfoKind::Family => consts::FAMILY.to_string(),
            DeviceInfoKind::Hostname => first_env(&["HOSTNAME", "COMPUTERNAME"])
                .or_else(|| {
                    std::fs::read_to_string("/etc/hostname")
                        .ok()
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                })
                .unwrap_or_else(|| "localhost".to_string()),
            DeviceInfoKind::Username => {
                first_env(&["USER", "USERNAME", "LOGNAME"]).unwrap_or_else(|| "unknown".into())
            }
            DeviceInfoKind::Locale => {
                first_env(&["LC_ALL", "LC_MESSAGES", "LANG"]).unwrap_or_else(|| "C".into())
            }
            DeviceInfoKind::IpAddress => local_ip_address(),
        }
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

// Connecting a UDP socket only selects a route; no packet leaves the machine.
fn local_ip_address() -> String {
    std::net::UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("192.0.2.1:9")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "127.0.0.1".to_string())
}

/// Random values from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomValueProvider for ThreadRandom {
    fn generate(&self, kind: RandomKind, options: &[String]) -> String {
        let mut rng = rand::thread_rng();
        match kind {
            RandomKind::Digit => rng.gen_range(0..10).to_string(),
            RandomKind::Latin => char::from(b'a' + rng.gen_range(0..26u8)).to_string(),
            RandomKind::Number => {
                let (low, high) = RandomKind::number_bounds(options);
                rng.gen_range(low..=high).to_string()
            }
            RandomKind::Uuid => uuid::Uuid::new_v4().to_string(),
            RandomKind::Custom => options.choose(&mut rng).cloned().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_config_only_bumps_level() {
        let config = DynamicValueConfig::new(ProcessingMode::FastAction).with_force_values(true);
        let nested = config.nested().nested();
        assert_eq!(nested.level(), 2);
        assert_eq!(nested.mode(), ProcessingMode::FastAction);
        assert!(nested.force_values());
        assert_eq!(config.level(), 0);
    }

    #[test]
    fn modes_round_trip_through_strings() {
        for mode in [
            ProcessingMode::Interactive,
            ProcessingMode::Preview,
            ProcessingMode::Edit,
            ProcessingMode::Recursive,
            ProcessingMode::FastAction,
        ] {
            assert_eq!(mode.as_str().parse::<ProcessingMode>().unwrap(), mode);
        }
        assert!("bogus".parse::<ProcessingMode>().is_err());
    }

    #[test]
    fn label_rendering_depends_on_mode() {
        assert!(ProcessingMode::Interactive.renders_labels());
        assert!(ProcessingMode::Edit.renders_labels());
        assert!(!ProcessingMode::Recursive.renders_labels());
        assert!(!ProcessingMode::FastAction.renders_labels());
    }

    #[test]
    fn thread_random_respects_kinds() {
        let random = ThreadRandom;
        let digit = random.generate(RandomKind::Digit, &[]);
        assert!(digit.len() == 1 && digit.chars().all(|c| c.is_ascii_digit()));

        let latin = random.generate(RandomKind::Latin, &[]);
        assert!(latin.len() == 1 && latin.chars().all(|c| c.is_ascii_lowercase()));

        let picked = random.generate(RandomKind::Custom, &["x".into(), "y".into()]);
        assert!(picked == "x" || picked == "y");
        assert_eq!(random.generate(RandomKind::Custom, &[]), "");

        let n: i64 = random
            .generate(RandomKind::Number, &["5".into(), "7".into()])
            .parse()
            .unwrap();
        assert!((5..=7).contains(&n));
    }

    #[test]
    fn system_device_info_reports_os() {
        assert_eq!(
            SystemDeviceInfo.value_for(DeviceInfoKind::Os),
            std::env::consts::OS
        );
    }
}
