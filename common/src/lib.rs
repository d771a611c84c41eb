pub mod tracer;

use clap::Args;

/// Scalar type used for every channel of a trace.
pub type Real = f64;

/// Position of a data record within a trace, header excluded.
pub type RecordIndex = usize;

/// Byte position of the start of a line within a trace file.
pub type ByteOffset = u64;

/// Number of file-native time sub-units per displayed unit.
/// Trace times are recorded in sub-units and divided by this for display.
pub const TIME_SUB_UNITS: Real = 1000.0;

/// Files at or below this size are parsed into memory when opened.
pub const DEFAULT_IN_MEMORY_LIMIT: u64 = 64 * 1024 * 1024;

/// Options shared by every component which opens trace files.
#[derive(Clone, Debug, Args)]
pub struct CommonEngineOpts {
    /// Trace files no larger than this many bytes are loaded into memory, larger ones are read by seeking.
    #[clap(long, env, default_value_t = DEFAULT_IN_MEMORY_LIMIT)]
    pub in_memory_limit: u64,
}
