use std::sync::Arc;
use std::sync::atomic::Ordering;

use node_monitor::{
    RuntimeStatistics,
    cluster::{SECRET_HEADER, sample_local_statistics},
    reporter::{CounterReporter, NodeCounters},
    util::{
        get_addr, get_advertised_address, get_counter_report_interval, get_hub_token,
        get_hub_url, get_port, get_secret,
    },
};
use rocket::{
    State,
    figment::Figment,
    get,
    http::Status,
    request::{FromRequest, Outcome},
    routes,
    serde::json::Json,
};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[get("/stats")]
#[instrument(skip_all)]
async fn stats(
    _secret: SecretKey,
    counters: &State<Arc<NodeCounters>>,
) -> Result<Json<RuntimeStatistics>, Status> {
    counters.stats_requests.fetch_add(1, Ordering::Relaxed);

    match rocket::tokio::task::spawn_blocking(sample_local_statistics).await {
        Ok(statistics) => Ok(Json(statistics)),
        Err(e) => {
            error!("sampling task failed: {e}");
            Err(Status::InternalServerError)
        }
    }
}

#[get("/ping")]
fn ping() {}

fn log_filter() -> filter::Targets {
    filter::Targets::new()
        .with_target("node_monitor", tracing::metadata::LevelFilter::DEBUG)
        .with_target(env!("CARGO_CRATE_NAME"), tracing::metadata::LevelFilter::DEBUG)
        .with_target("rocket", tracing::metadata::LevelFilter::INFO)
}

fn init() {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(true),
        )
        .with(log_filter())
        .init();
}

fn get_config() -> Figment {
    rocket::Config::figment()
        .merge(("port", get_port()))
        .merge(("address", get_addr()))
        .merge(("workers", 1))
}

fn spawn_reporter(counters: Arc<NodeCounters>) -> anyhow::Result<()> {
    let Some(hub_url) = get_hub_url() else {
        debug!("HUB_URL not set, counter reporting disabled");
        return Ok(());
    };

    let address = get_advertised_address().parse()?;
    info!("reporting counters for {address} to {hub_url}");

    let reporter = CounterReporter::new(
        &hub_url,
        &address,
        get_hub_token(),
        get_counter_report_interval(),
        counters,
    )?;

    tokio::spawn(reporter.run());
    Ok(())
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    init();

    let counters = Arc::new(NodeCounters::default());

    if let Err(e) = spawn_reporter(counters.clone()) {
        warn!("counter reporting disabled: {e}");
    }

    rocket::custom(get_config())
        .manage(counters)
        .mount("/", routes![stats, ping])
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("node server failed: {e}"))?;

    Ok(())
}

#[derive(Debug)]
struct SecretKey;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SecretKey {
    type Error = ();

    async fn from_request(request: &'r rocket::Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(secret) = get_secret() else {
            return Outcome::Success(SecretKey);
        };

        match request.headers().get_one(SECRET_HEADER) {
            Some(passed_secret) if passed_secret == secret => Outcome::Success(SecretKey),
            _ => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}
