use academic_matcher::db::{establish_connection_pool, run_migrations};
use academic_matcher::models::config::ServerConfig;
use academic_matcher::processing::embedding::FastembedEncoder;
use academic_matcher::processing::engine::{EngineSettings, MatchEngine};
use academic_matcher::processing::explain::LlmExplainer;
use academic_matcher::processing::{EngineRequest, EngineResponse, ErrorKind};
use academic_matcher::repository::DieselRepository;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let pool = match establish_connection_pool(&config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    match pool.get() {
        Ok(mut conn) => {
            if let Err(e) = run_migrations(&mut conn) {
                log::error!("Failed to run migrations: {e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            log::error!("Failed to get database connection: {e}");
            std::process::exit(1);
        }
    }

    let encoder = match FastembedEncoder::new() {
        Ok(encoder) => encoder,
        Err(e) => {
            log::error!("Failed to initialize the embedding model: {e}");
            std::process::exit(1);
        }
    };

    let explainer = match LlmExplainer::new(&config.llm) {
        Ok(explainer) => explainer,
        Err(e) => {
            log::error!("Failed to build the LLM explainer: {e}");
            std::process::exit(1);
        }
    };

    let repo = DieselRepository::new(pool);
    let mut engine = MatchEngine::new(repo, encoder, explainer, EngineSettings::from(&config));

    match engine.reload_corpus() {
        Ok(size) => log::info!("Loaded corpus with {size} profiles"),
        Err(e) => log::warn!("Serving without a corpus until a rebuild succeeds: {e}"),
    }

    let context = zmq::Context::new();
    let responder = context.socket(zmq::REP).expect("Cannot create zmq socket");
    responder
        .bind(&config.zmq_address)
        .expect("Cannot bind to zmq port");
    log::info!("Listening on {}", config.zmq_address);

    loop {
        let msg = match responder.recv_bytes(0) {
            Ok(msg) => msg,
            Err(e) => {
                log::error!("Failed to receive request: {e}");
                continue;
            }
        };

        let response = match serde_json::from_slice::<EngineRequest>(&msg) {
            Ok(request) => engine.handle(request).await,
            Err(e) => EngineResponse::Error {
                kind: ErrorKind::InvalidInput,
                message: format!("malformed request: {e}"),
            },
        };

        let payload = serde_json::to_vec(&response).unwrap_or_else(|e| {
            log::error!("Failed to encode response: {e}");
            br#"{"Error":{"kind":"internal","message":"response encoding failed"}}"#.to_vec()
        });

        if let Err(e) = responder.send(payload, 0) {
            log::error!("Failed to send response: {e}");
        }
    }
}
