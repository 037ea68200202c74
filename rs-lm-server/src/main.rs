use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::{get, post, put, web, App, HttpResponse, HttpServer, Responder};
use log::info;
use serde::{Deserialize, Serialize};

use rs_lm_core::clock::{Clock, SystemClock};
use rs_lm_core::error::LmError;
use rs_lm_core::model::ngram_model::NGramModel;
use rs_lm_core::model::request::GenerateRequest;
use rs_lm_core::model::smoothing::kneser_ney::KneserNey;
use rs_lm_core::model::smoothing::simple_backoff::SimpleBackoff;
use rs_lm_core::model::smoothing::SmoothingStrategy;
use rs_lm_core::model::trainer::NGramTrainer;
use rs_lm_core::tokenizer::code::CodeTokenizer;
use rs_lm_core::tokenizer::whitespace::WhitespaceTokenizer;
use rs_lm_core::tokenizer::Tokenizer;

/// JSON body for the `/v1/train` endpoint.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrainParams {
	corpus_path: String,
	output_path: String,
	#[serde(default = "default_order")]
	order: usize,
	#[serde(default = "default_tokenizer")]
	tokenizer: String,
}

fn default_order() -> usize {
	3
}

fn default_tokenizer() -> String {
	"whitespace".to_owned()
}

/// JSON response of the `/v1/train` endpoint.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrainSummary {
	status: String,
	model: String,
	vocab_size: usize,
	latency_ms: u64,
}

/// JSON body for the `/v1/load_model` endpoint.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadParams {
	artifact_path: String,
	#[serde(default = "default_smoothing")]
	smoothing: String,
}

fn default_smoothing() -> String {
	"backoff".to_owned()
}

/// JSON response of the `/v1/model` endpoint.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
	model: String,
	order: usize,
	vocab_size: usize,
	total_tokens: usize,
	total_ngrams: usize,
	tokenizer: String,
	smoothing: String,
	trained_at: String,
	corpus_info: String,
}

struct SharedData {
	model: Option<NGramModel>,
}

/// Resolves a smoothing strategy from its request name.
fn smoothing_from_name(name: &str) -> Result<Box<dyn SmoothingStrategy>, String> {
	match name {
		"backoff" => Ok(Box::new(SimpleBackoff::default())),
		"kneser-ney" => Ok(Box::new(KneserNey::default())),
		other => Err(format!("Unknown smoothing strategy: {other}")),
	}
}

/// Maps a core error onto the HTTP status it belongs to.
fn error_response(error: LmError) -> HttpResponse {
	match &error {
		LmError::EmptyPrompt | LmError::InvalidConfiguration(_) => {
			HttpResponse::BadRequest().body(error.to_string())
		}
		_ => HttpResponse::InternalServerError().body(error.to_string()),
	}
}

/// HTTP POST endpoint `/v1/generate`
///
/// Runs the generation loop of the loaded model with the sampling
/// parameters from the JSON body and returns the generated text with
/// its usage accounting.
#[post("/v1/generate")]
async fn post_generate(
	data: web::Data<Mutex<SharedData>>,
	body: web::Json<GenerateRequest>,
) -> impl Responder {
	let request = body.into_inner();

	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	let model = match &shared_data.model {
		Some(m) => m,
		None => return HttpResponse::Conflict().body("No model loaded"),
	};

	match model.generate(&request) {
		Ok(response) => HttpResponse::Ok().json(response),
		Err(e) => error_response(e),
	}
}

/// HTTP POST endpoint `/v1/train`
///
/// Trains an artifact from a corpus file, persists it to the requested
/// path and swaps it in as the loaded model with default smoothing.
#[post("/v1/train")]
async fn post_train(
	data: web::Data<Mutex<SharedData>>,
	body: web::Json<TrainParams>,
) -> impl Responder {
	let params = body.into_inner();
	let clock = SystemClock;
	let started = clock.now_millis();

	let trainer = match NGramTrainer::new(params.order) {
		Ok(t) => t,
		Err(e) => return error_response(e),
	};

	let corpus = match std::fs::read_to_string(&params.corpus_path) {
		Ok(c) => c,
		Err(e) => {
			return HttpResponse::InternalServerError().body(format!("Failed to read corpus: {e}"))
		}
	};

	let tokenizer: Box<dyn Tokenizer> = match params.tokenizer.as_str() {
		"whitespace" => Box::new(WhitespaceTokenizer::from_corpus(&corpus)),
		"code" => Box::new(CodeTokenizer::from_corpus(&corpus)),
		other => {
			return HttpResponse::BadRequest().body(format!("Unknown tokenizer kind: {other}"))
		}
	};

	let artifact = trainer.train_from_text(&corpus, tokenizer.as_ref());
	if let Err(e) = artifact.save(&params.output_path) {
		return HttpResponse::InternalServerError().body(format!("Failed to save artifact: {e}"));
	}

	let model = NGramModel::new(artifact, tokenizer, Box::new(SimpleBackoff::default()));
	let summary = TrainSummary {
		status: "success".to_owned(),
		model: model.model_name(),
		vocab_size: model.vocab_size(),
		latency_ms: clock.now_millis().saturating_sub(started),
	};

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	shared_data.model = Some(model);

	info!(
		"trained and loaded {} from {} in {} ms",
		summary.model, params.corpus_path, summary.latency_ms
	);
	HttpResponse::Ok().json(summary)
}

/// HTTP PUT endpoint `/v1/load_model`
///
/// Loads a previously trained artifact from disk and makes it the
/// current model, with the smoothing strategy named in the body.
#[put("/v1/load_model")]
async fn put_load_model(
	data: web::Data<Mutex<SharedData>>,
	body: web::Json<LoadParams>,
) -> impl Responder {
	let params = body.into_inner();

	let smoothing = match smoothing_from_name(&params.smoothing) {
		Ok(s) => s,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let model = match NGramModel::from_artifact(&params.artifact_path, smoothing) {
		Ok(m) => m,
		Err(e) => {
			return HttpResponse::InternalServerError().body(format!("Failed to load model: {e}"))
		}
	};

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	info!("loaded {} from {}", model.model_name(), params.artifact_path);
	shared_data.model = Some(model);

	HttpResponse::Ok().body("Model loaded successfully")
}

/// HTTP GET endpoint `/v1/model`
///
/// Describes the currently loaded model, or 409 when none is loaded.
#[get("/v1/model")]
async fn get_model(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	match &shared_data.model {
		Some(model) => {
			let metadata = model.metadata();
			HttpResponse::Ok().json(ModelInfo {
				model: model.model_name(),
				order: model.order(),
				vocab_size: model.vocab_size(),
				total_tokens: metadata.total_tokens,
				total_ngrams: metadata.total_ngrams,
				tokenizer: metadata.tokenizer_type.clone(),
				smoothing: model.smoothing().description(),
				trained_at: metadata.trained_at.clone(),
				corpus_info: metadata.corpus_info.clone(),
			})
		}
		None => HttpResponse::Conflict().body("No model loaded"),
	}
}

/// Main entry point for the server.
///
/// Starts with no model loaded; `/v1/train` or `/v1/load_model` must be
/// called before `/v1/generate` answers anything but 409.
///
/// # Notes
/// - The bind address comes from `RS_LM_HOST` / `RS_LM_PORT`, with
///   127.0.0.1:5000 as default.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let host = std::env::var("RS_LM_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
	let port = std::env::var("RS_LM_PORT")
		.ok()
		.and_then(|p| p.parse::<u16>().ok())
		.unwrap_or(5000);

	let shared_data = SharedData { model: None };
	let shared_model = web::Data::new(Mutex::new(shared_data));

	info!("listening on {host}:{port}");

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_model.clone())
			.service(post_generate)
			.service(post_train)
			.service(put_load_model)
			.service(get_model)
	})
		.bind((host, port))?
		.run()
		.await
}
