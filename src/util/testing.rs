use std::env;
use std::sync::{Arc, Once};

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{DecisionTree, TreeBuilder};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    // arena internals are not interesting in test output
    let noisy_modules = ["generational_arena"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// The two-question sample tree used across tests:
///
/// ```text
/// Do you like numbers?
/// ├── yes: Do you like proofs?
/// │   ├── yes: Mathematics (MAT)
/// │   └── no: Economics (ECO)
/// └── no: Which field?
///     ├── people: Psychology (PSY)
///     └── words: Linguistics (LIN)
/// ```
pub fn sample_tree() -> Arc<DecisionTree> {
    let mut b = TreeBuilder::new();
    let mat = b.leaf("Mathematics", "MAT");
    let eco = b.leaf("Economics", "ECO");
    let proofs = b.binary("Do you like proofs?", mat, eco);
    let psy = b.leaf("Psychology", "PSY");
    let lin = b.leaf("Linguistics", "LIN");
    let field = b
        .options("Which field?", [("people", psy), ("words", lin)])
        .unwrap_or_else(|e| panic!("sample tree: {e}"));
    let root = b.binary("Do you like numbers?", proofs, field);
    Arc::new(
        b.build(root)
            .unwrap_or_else(|e| panic!("sample tree: {e}")),
    )
}
