use std::path::PathBuf;

pub const DEFAULT_ADDRESS: &str = "3000";
pub const DEFAULT_CLUSTER_ID: u128 = 0;
pub const DEFAULT_LEDGER: u32 = 700;
pub const DEFAULT_CODE: u16 = 10;
pub const DEFAULT_FLAGS: u16 = 0;
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Ledger, code and flags stamped onto every record a command builds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordOptions {
    pub ledger: u32,
    pub code: u16,
    pub flags: u16,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            ledger: DEFAULT_LEDGER,
            code: DEFAULT_CODE,
            flags: DEFAULT_FLAGS,
        }
    }
}

/// Process-wide settings resolved once from flags and the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Cluster replica address, either `host:port` or a bare port.
    pub address: String,
    pub cluster_id: u128,
    pub record: RecordOptions,

    /// Directory that `generate` writes its sample files into.
    pub output_dir: PathBuf,

    /// Number of `-v` flags given.
    pub verbosity: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            cluster_id: DEFAULT_CLUSTER_ID,
            record: RecordOptions::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            verbosity: 0,
        }
    }
}

impl Settings {
    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "tigerbeagle=info,warn",
            _ => "tigerbeagle=debug,info",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_raise_log_level_with_verbosity() {
        let mut settings = Settings::default();
        assert_eq!(settings.log_filter(), "warn");

        settings.verbosity = 1;
        assert_eq!(settings.log_filter(), "tigerbeagle=info,warn");

        settings.verbosity = 5;
        assert_eq!(settings.log_filter(), "tigerbeagle=debug,info");
    }
}
