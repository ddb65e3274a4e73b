//! Run configuration.
//!
//! A [`RunConfig`] is immutable for the duration of one run. Cross-field
//! rules are checked by [`RunConfig::validate`] before any repository work
//! starts; a conflicting configuration never touches the working area.

use std::fmt;
use std::path::PathBuf;

use super::filter_spec::FilterSpec;
use super::ref_match::RefMatcher;

/// Which tags are translated to the destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TagPlan {
    /// Only tags the rewrite engine visited (tags inside rewritten ranges).
    #[default]
    Visited,
    /// Visited tags plus an ancestor-walk remap for every other in-scope tag.
    All,
    /// No tag handling at all.
    None,
}

impl TagPlan {
    /// Parses the `--tags-plan` flag value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "visited" => Some(Self::Visited),
            "all" => Some(Self::All),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

impl fmt::Display for TagPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visited => write!(f, "visited"),
            Self::All => write!(f, "all"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Immutable configuration of one rewrite run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub source_url: String,
    pub destination_url: String,
    pub workdir: PathBuf,
    pub branches: RefMatcher,
    pub tags: RefMatcher,
    pub tag_plan: TagPlan,
    /// Ancestor budget for the tag remap walk. Always ≥ 1.
    pub tag_history_lookup: u32,
    pub prune_branches: bool,
    pub prune_tags: bool,
    /// Whether local clones may hardlink objects.
    pub allow_hardlinks: bool,
    /// Whether the destination push updates all refs atomically.
    pub atomic_push: bool,
    /// Whether the exclusive-run guard is active.
    pub locking: bool,
    pub filter: FilterSpec,
}

/// Default ancestor budget for the tag remap walk.
pub const DEFAULT_TAG_HISTORY_LOOKUP: u32 = 50;

impl RunConfig {
    /// A configuration with every optional knob at its default.
    #[must_use]
    pub fn new(source_url: String, filter: FilterSpec, destination_url: String) -> Self {
        Self {
            source_url,
            destination_url,
            workdir: PathBuf::from("./temp"),
            branches: RefMatcher::default(),
            tags: RefMatcher::default(),
            tag_plan: TagPlan::Visited,
            tag_history_lookup: DEFAULT_TAG_HISTORY_LOOKUP,
            prune_branches: false,
            prune_tags: false,
            allow_hardlinks: true,
            atomic_push: true,
            locking: true,
            filter,
        }
    }

    /// Checks cross-field rules.
    ///
    /// With tag plan `none` there is no tag pass at all, so tag selection
    /// lists and both prune passes have no coherent basis and are rejected.
    ///
    /// # Errors
    /// Returns the first conflict found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tag_plan == TagPlan::None {
            if !self.tags.is_unrestricted() {
                return Err(ConfigError::TagListsWithPlanNone);
            }
            if self.prune_branches {
                return Err(ConfigError::PruneBranchesWithPlanNone);
            }
            if self.prune_tags {
                return Err(ConfigError::PruneTagsWithPlanNone);
            }
        }
        if self.tag_history_lookup == 0 {
            return Err(ConfigError::ZeroTagHistoryLookup);
        }
        Ok(())
    }
}

/// A configuration that conflicts with itself.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// Tag whitelist/blacklist given while the tag plan is `none`.
    TagListsWithPlanNone,
    /// Branch pruning requested while the tag plan is `none`.
    PruneBranchesWithPlanNone,
    /// Tag pruning requested while the tag plan is `none`.
    PruneTagsWithPlanNone,
    /// The ancestor budget must be at least 1.
    ZeroTagHistoryLookup,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagListsWithPlanNone => {
                write!(f, "tag whitelist/blacklist require a tag plan other than 'none'")
            }
            Self::PruneBranchesWithPlanNone => {
                write!(f, "--prune-branches requires a tag plan other than 'none'")
            }
            Self::PruneTagsWithPlanNone => {
                write!(f, "--prune-tags requires a tag plan other than 'none'")
            }
            Self::ZeroTagHistoryLookup => {
                write!(f, "tag history lookup depth must be at least 1")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
