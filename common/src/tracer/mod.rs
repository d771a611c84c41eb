mod tracer_engine;

pub use tracer_engine::{TracerEngine, TracerOptions};

/// Should be called at the start of each binary.
/// Installs the stderr subscriber, filtered by `RUST_LOG`, falling back
/// to the given default level when `RUST_LOG` is unset.
/// An optional second argument switches ANSI colour codes on or off.
#[macro_export]
macro_rules! init_tracer {
    ($level:expr) => {{ $crate::init_tracer!($level, true) }};
    ($level:expr, $with_ansi:expr) => {{
        $crate::tracer::TracerEngine::new(
            $crate::tracer::TracerOptions::new($level).with_ansi($with_ansi),
            env!("CARGO_BIN_NAME"),
        )
    }};
}
