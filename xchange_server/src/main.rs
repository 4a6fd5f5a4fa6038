const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7878";

fn main() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("xchange_server panicked: {info}\n{}", std::backtrace::Backtrace::force_capture());
    }));

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "xchange_server=info".into()),
        )
        .init();

    let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    if let Err(e) = runtime.block_on(run()) {
        tracing::error!(error = %e, "server exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let bind_addr = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

    let dispatcher = xchange_server::new_dispatcher();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "xchange_server listening");

    xchange_server::serve(listener, dispatcher).await?;
    Ok(())
}
