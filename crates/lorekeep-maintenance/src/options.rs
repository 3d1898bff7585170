//! Run options and campaign selection.
//!
//! Flag parsing lives in the binary; this module turns raw flag values into
//! a checked [`Options`] and a [`CampaignSelection`], rejecting illegal
//! combinations with [`ConfigurationError`].

use core::fmt;

use serde::{Deserialize, Serialize};

use lorekeep_ledger::cursor::DEFAULT_PAGE_SIZE;
use lorekeep_types::{CampaignId, ConfigurationError};

/// Default number of warnings printed per campaign.
pub const DEFAULT_WARNINGS_CAP: usize = 25;

/// What a run does with each campaign's log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Count events without touching projections.
    Scan,
    /// Count events and check every snapshot event against its system.
    Validate,
    /// Re-apply snapshot events into the live projections.
    Replay,
    /// Replay into a scratch store and diff against the live projections.
    Integrity,
}

impl Mode {
    /// The mode's name as it appears in reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Validate => "validate",
            Self::Replay => "replay",
            Self::Integrity => "integrity",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw flag values, before checking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    /// `--dry-run`
    pub dry_run: bool,
    /// `--validate`
    pub validate: bool,
    /// `--integrity`
    pub integrity: bool,
    /// `--after-seq`
    pub after_seq: u64,
    /// `--warnings-cap`; `None` means the default.
    pub warnings_cap: Option<i64>,
    /// `--max-invalid`
    pub max_invalid: Option<u64>,
}

/// Checked run options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// What to do.
    pub mode: Mode,
    /// Only events after this sequence number are considered.
    pub after_seq: u64,
    /// Warnings kept per campaign. Zero keeps all of them.
    pub warnings_cap: usize,
    /// Fail a validate run that finds more invalid events than this.
    pub max_invalid: Option<u64>,
    /// Events read per page.
    pub page_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mode: Mode::Replay,
            after_seq: 0,
            warnings_cap: DEFAULT_WARNINGS_CAP,
            max_invalid: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Options {
    /// Check a flag combination.
    ///
    /// `--validate` is read-only, so it wins over `--dry-run`. Without
    /// either, the run replays.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError`] when `--integrity` is combined with
    /// `--dry-run`, `--validate`, or `--after-seq`, or the warnings cap is
    /// negative.
    pub fn from_flags(flags: &Flags) -> Result<Self, ConfigurationError> {
        if flags.integrity && (flags.dry_run || flags.validate) {
            return Err(ConfigurationError::new(
                "--integrity cannot be combined with --dry-run or --validate",
            ));
        }
        if flags.integrity && flags.after_seq > 0 {
            return Err(ConfigurationError::new(
                "--integrity does not support --after-seq",
            ));
        }
        let warnings_cap = match flags.warnings_cap {
            None => DEFAULT_WARNINGS_CAP,
            Some(cap) => usize::try_from(cap)
                .map_err(|_| ConfigurationError::new("--warnings-cap must be >= 0"))?,
        };
        let mode = if flags.integrity {
            Mode::Integrity
        } else if flags.validate {
            Mode::Validate
        } else if flags.dry_run {
            Mode::Scan
        } else {
            Mode::Replay
        };
        Ok(Self {
            mode,
            after_seq: flags.after_seq,
            warnings_cap,
            max_invalid: flags.max_invalid,
            ..Self::default()
        })
    }

    /// Override the page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Which campaigns a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignSelection {
    /// The listed campaigns, in order.
    Ids(Vec<CampaignId>),
    /// Every campaign with at least one event.
    All,
}

/// Split a comma-separated list, trimming entries and dropping blanks.
pub fn split_csv(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Resolve `--campaign-id`, `--campaign-ids` and `--all-campaigns`.
///
/// # Errors
///
/// [`ConfigurationError`] unless exactly one selector is given, or when an
/// id does not parse.
pub fn resolve_campaign_ids(
    single: Option<&str>,
    list: Option<&str>,
    all: bool,
) -> Result<CampaignSelection, ConfigurationError> {
    let single = single.map(str::trim).filter(|s| !s.is_empty());
    let list = list.map(split_csv).filter(|ids| !ids.is_empty());

    match (single, list, all) {
        (None, None, true) => Ok(CampaignSelection::All),
        (Some(id), None, false) => Ok(CampaignSelection::Ids(vec![parse_id(id)?])),
        (None, Some(ids), false) => ids
            .into_iter()
            .map(parse_id)
            .collect::<Result<_, _>>()
            .map(CampaignSelection::Ids),
        (None, None, false) => Err(ConfigurationError::new(
            "one of --campaign-id, --campaign-ids or --all-campaigns is required",
        )),
        _ => Err(ConfigurationError::new(
            "--campaign-id, --campaign-ids and --all-campaigns are mutually exclusive",
        )),
    }
}

fn parse_id(raw: &str) -> Result<CampaignId, ConfigurationError> {
    raw.parse()
        .map_err(|err| ConfigurationError::new(format!("invalid campaign id {raw:?}: {err}")))
}
