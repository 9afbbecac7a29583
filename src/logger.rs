use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the terminal subscriber; `RUST_LOG` takes precedence over `verbose`
pub fn init_logger(verbose: bool) {
    let default_filter = if verbose {
        "rosette_traits_lib=debug,rosette_traits_cli=debug,info"
    } else {
        "rosette_traits_lib=info,rosette_traits_cli=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .compact(),
        )
        .init();
}
