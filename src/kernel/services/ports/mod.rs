//! Service ports: data contracts shared by the kernel and adapters.

pub mod file;
pub mod search;
pub mod settings;

pub use file::{CommitSummary, PatchError};
pub use search::{
    ByteOffset, ExitInfo, Invocation, Match, PatternQuery, Position, Query, RangeInfo, RuleQuery,
    SearchMessage, SessionError, SessionId, Strictness, DEFAULT_STRICTNESS, SESSION_ID_MODULUS,
};
pub use settings::{DisplaySettings, Settings, SettingsError};
