//! Service adapters: OS/runtime specific implementations (IO/async).

pub mod dirs;
pub mod file;
pub mod search;
pub mod settings;

pub use dirs::{ensure_log_dir, get_cache_dir, get_log_dir};
pub use file::{commit_file, preview_file, read_original};
pub use search::{
    build_command, LineDecoder, ProcessEvent, ProcessEvents, ProcessFailure, ProcessHandle,
    ProcessSession, SearchSessionManager,
};
pub use settings::{ensure_settings_file, get_settings_path, load_settings, load_settings_from};
