use std::{fs, net::SocketAddr, process};

use quaderno::{
    application::{
        analytics::AnalyticsLimits,
        content::ContentLoader,
        error::AppError,
        render::{
            RenderPipelineConfig, RenderRequest, RenderService, configure_render_service,
            render_service,
        },
        site::SiteBuilder,
    },
    config,
    domain::content::Collection,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args.command.unwrap_or_default();

    telemetry::init(&settings.logging).map_err(AppError::from)?;
    configure_render_service(RenderPipelineConfig::from(&settings.render))
        .map_err(|err| AppError::unexpected(err.to_string()))?;

    match command {
        config::Command::Serve(_) => serve_http(&settings).await,
        config::Command::Check(_) => run_check(&settings),
        config::Command::Render(args) => run_render(args),
        config::Command::Build(_) => run_build(&settings),
    }
}

fn run_check(settings: &config::Settings) -> Result<(), AppError> {
    let loaded = ContentLoader::new(&settings.content.root).load()?;

    for error in &loaded.errors {
        warn!(target = "quaderno::check", error = %error, "invalid document");
        eprintln!("{error}");
    }

    for collection in Collection::ALL {
        println!(
            "{collection}: {} entries",
            loaded.in_collection(collection).count()
        );
    }

    if loaded.is_valid() {
        println!("all documents valid");
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "{} invalid document(s)",
            loaded.errors.len()
        )))
    }
}

fn run_render(args: config::RenderArgs) -> Result<(), AppError> {
    let markdown = fs::read_to_string(&args.file)?;
    let request = RenderRequest::new(markdown).with_source_path(args.file.clone());
    let output = render_service().render(&request)?;

    info!(
        target = "quaderno::render",
        file = %args.file.display(),
        wikilinks = output.wikilinks.len(),
        contains_code = output.contains_code,
        contains_math = output.contains_math,
        "Document rendered"
    );
    println!("{}", output.html);
    Ok(())
}

fn run_build(settings: &config::Settings) -> Result<(), AppError> {
    let builder = SiteBuilder::new(ContentLoader::new(&settings.content.root), render_service());
    let report = builder.build(&settings.content.out_dir)?;

    for (collection, count) in &report.collections {
        println!("{collection}: {count} entries");
    }
    println!(
        "wrote {} entries ({} wikilinks) to {}",
        report.entries(),
        report.wikilinks,
        report.out_dir.display()
    );
    Ok(())
}

async fn serve_http(settings: &config::Settings) -> Result<(), AppError> {
    let state = HttpState::new(AnalyticsLimits::from(&settings.analytics));
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "quaderno::serve",
        addr = %settings.server.addr,
        capacity = settings.analytics.capacity.get(),
        "Analytics API listening"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "quaderno::serve", "Analytics API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target = "quaderno::serve", error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
