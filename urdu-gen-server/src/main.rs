use std::convert::Infallible;

use actix_cors::Cors;
use actix_web::web::Bytes;
use actix_web::{get, post, web, App, HttpResponse, HttpServer, Responder};

use futures_util::stream;
use log::info;
use serde::Serialize;
use urdu_gen_core::model::generation_input::{GenerationRequest, GenerationResponse};
use urdu_gen_core::model::generator::display_fragment;
use urdu_gen_core::{GeneratorConfig, StoryGeneratorApi};

/// Environment variable pointing to an explicit configuration file.
const CONFIG_ENV: &str = "URDU_GEN_CONFIG";

/// Last event of every successful `/stream` response.
const DONE_EVENT: &str = "event: done\ndata: \n\n";

#[derive(Serialize)]
struct Status {
	status: &'static str,
	message: &'static str
}

/// Converts a facade response into an HTTP response.
///
/// Failures are request validation errors, reported as 422.
fn respond(response: GenerationResponse) -> HttpResponse {
	if response.success {
		HttpResponse::Ok().json(response)
	} else {
		HttpResponse::UnprocessableEntity().json(response)
	}
}

/// HTTP GET endpoint `/health`
#[get("/health")]
async fn get_health() -> impl Responder {
	HttpResponse::Ok().json(Status { status: "ok", message: "Backend is running" })
}

#[get("/")]
async fn get_root() -> impl Responder {
	HttpResponse::Ok().json(Status { status: "ok", message: "Urdu Story Generator API" })
}

/// HTTP POST endpoint `/generate`
///
/// Body: JSON `GenerationRequest` (`prefix`, `max_length`, `temperature`, `seed`),
/// every field optional.
#[post("/generate")]
async fn post_generate(api: web::Data<StoryGeneratorApi>, request: web::Json<GenerationRequest>) -> impl Responder {
	respond(api.generate(&request))
}

/// HTTP GET endpoint `/generate`, same parameters as the POST body.
#[get("/generate")]
async fn get_generate(api: web::Data<StoryGeneratorApi>, query: web::Query<GenerationRequest>) -> impl Responder {
	respond(api.generate(&query))
}

/// Formats `text` as one server-sent event.
///
/// Each line of `text` becomes its own `data:` line; clients join them
/// back with `\n`.
fn sse_data(text: &str) -> String {
	let mut event: String = text.split('\n').map(|line| format!("data: {line}\n")).collect();
	event.push('\n');
	event
}

/// HTTP GET endpoint `/stream`, same parameters as `/generate`.
///
/// Streams the display fragment of each token as a server-sent event while
/// it is generated, then a `done` event. Joining the fragments and applying
/// `clean_display` gives the `/generate` story for the same seed.
#[get("/stream")]
async fn get_stream(api: web::Data<StoryGeneratorApi>, query: web::Query<GenerationRequest>) -> impl Responder {
	let tokens = match api.stream(&query) {
		Ok(tokens) => tokens,
		Err(e) => {
			return HttpResponse::Ok()
				.content_type("text/event-stream")
				.body(format!("event: error\ndata: {e}\n\n"));
		}
	};

	let events = tokens
		.map(|token| sse_data(&display_fragment(&token)))
		.chain(std::iter::once(DONE_EVENT.to_owned()))
		.map(|event| Ok::<_, Infallible>(Bytes::from(event)));
	HttpResponse::Ok()
		.content_type("text/event-stream")
		.streaming(stream::iter(events))
}

#[get("/model-info")]
async fn get_model_info(api: web::Data<StoryGeneratorApi>) -> impl Responder {
	HttpResponse::Ok().json(api.model_info())
}

/// Registers every endpoint on an actix `ServiceConfig`.
fn routes(cfg: &mut web::ServiceConfig) {
	cfg.service(get_health)
		.service(get_root)
		.service(post_generate)
		.service(get_generate)
		.service(get_stream)
		.service(get_model_info);
}

/// Main entry point for the server.
///
/// Loads the configuration (from `URDU_GEN_CONFIG` if set), loads or trains
/// the model, and serves it read-only to every worker.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config = match std::env::var_os(CONFIG_ENV) {
		Some(path) => GeneratorConfig::load_path(path),
		None => GeneratorConfig::load()
	};
	let api = StoryGeneratorApi::ensure_model(&config).map_err(std::io::Error::other)?;
	let shared_api = web::Data::new(api);
	info!("Model loaded, listening on {}:{}", config.host, config.port);

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_api.clone())
			.configure(routes)
	})
		.bind((config.host.as_str(), config.port))?
		.run()
		.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::{http::StatusCode, test};
	use std::fs;
	use urdu_gen_core::model::generator::{StoryGenerator, clean_display};
	use urdu_gen_core::model::InterpolationWeights;
	use urdu_gen_core::tokenizer::{Marker, learn_vocabulary};

	fn api() -> StoryGeneratorApi {
		let corpus = ["ایک دن ایک لڑکا گھر گیا <EOS> <EOP> وہ سو گیا <EOS> <EOT>", "ایک دن بارش ہوئی <EOS> <EOT>"];
		let tokenizer = learn_vocabulary(&corpus, 40);
		StoryGeneratorApi::new(StoryGenerator::train(tokenizer, InterpolationWeights::default(), &corpus))
	}

	macro_rules! service {
		() => {
			test::init_service(App::new().app_data(web::Data::new(api())).configure(routes)).await
		};
	}

	#[actix_web::test]
	async fn health_is_ok() {
		let app = service!();
		let response: serde_json::Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
		assert_eq!(response["status"], "ok");
	}

	#[actix_web::test]
	async fn post_generate_with_prefix() {
		let app = service!();
		let request = test::TestRequest::post()
			.uri("/generate")
			.set_json(serde_json::json!({"prefix": "ایک دن", "max_length": 50, "temperature": 0.8, "seed": 1}))
			.to_request();
		let response: GenerationResponse = test::call_and_read_body_json(&app, request).await;
		assert!(response.success);
		assert_eq!(response.prefix, "ایک دن");
		assert!(response.story.is_some_and(|s| s.starts_with("ایک دن")));
	}

	#[actix_web::test]
	async fn get_generate_without_prefix() {
		let app = service!();
		let request = test::TestRequest::get().uri("/generate?max_length=50&seed=3").to_request();
		let response: GenerationResponse = test::call_and_read_body_json(&app, request).await;
		assert!(response.success);
		assert!(response.story.is_some());
	}

	#[actix_web::test]
	async fn rejects_oversized_requests() {
		let app = service!();
		let request = test::TestRequest::post()
			.uri("/generate")
			.set_json(serde_json::json!({"prefix": "", "max_length": 9999}))
			.to_request();
		let response = test::call_service(&app, request).await;
		assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
	}

	/// Payloads of the data events of a `/stream` body.
	fn stream_payloads(body: &str) -> Vec<String> {
		body.split("\n\n")
			.take_while(|event| !event.starts_with("event: "))
			.filter(|event| !event.is_empty())
			.map(|event| {
				event
					.lines()
					.map(|line| line.strip_prefix("data: ").unwrap())
					.collect::<Vec<_>>()
					.join("\n")
			})
			.collect()
	}

	macro_rules! read_stream {
		($app:expr, $uri:expr) => {{
			let body = test::call_and_read_body(&$app, test::TestRequest::get().uri($uri).to_request()).await;
			String::from_utf8(body.to_vec()).unwrap()
		}};
	}

	#[actix_web::test]
	async fn stream_ends_with_done_event() {
		let app = service!();
		let body = read_stream!(app, "/stream?max_length=20&seed=9");
		assert!(body.ends_with(DONE_EVENT));
		assert!(stream_payloads(&body).len() <= 20);
	}

	#[actix_web::test]
	async fn stream_sends_display_fragments_matching_generate() {
		let app = service!();
		let body = read_stream!(app, "/stream?max_length=200&temperature=1.2&seed=9");
		let payloads = stream_payloads(&body);
		assert!(!payloads.is_empty());
		for payload in &payloads {
			assert!(!payload.contains('▁'), "{payload:?}");
			for marker in Marker::ALL {
				assert!(!payload.contains(marker.as_str()), "{payload:?}");
			}
		}

		let request = test::TestRequest::post()
			.uri("/generate")
			.set_json(serde_json::json!({"prefix": "", "max_length": 200, "temperature": 1.2, "seed": 9}))
			.to_request();
		let response: GenerationResponse = test::call_and_read_body_json(&app, request).await;
		assert_eq!(Some(clean_display(&payloads.concat())), response.story);
	}

	#[actix_web::test]
	async fn stream_reports_invalid_requests() {
		let app = service!();
		let body = read_stream!(app, "/stream?max_length=0");
		assert!(body.starts_with("event: error\ndata: "));
	}

	#[core::prelude::rust_2024::test]
	fn multi_line_fragments_span_several_data_lines() {
		assert_eq!(sse_data(" \n\n "), "data:  \ndata: \ndata:  \n\n");
		assert_eq!(stream_payloads(&sse_data(" \n\n ")), vec![" \n\n ".to_owned()]);
	}

	#[actix_web::test]
	async fn model_info_reports_vocabulary() {
		let app = service!();
		let info: serde_json::Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/model-info").to_request()).await;
		assert!(info["vocabulary_size"].as_u64().unwrap() > 0);
		assert_eq!(info["is_trained"], true);
	}

	#[actix_web::test]
	async fn ensure_model_serves_an_untrained_model() {
		let dir = tempfile::tempdir().unwrap();
		fs::create_dir_all(dir.path().join("corpus")).unwrap();
		let config = GeneratorConfig {
			corpus_dir: dir.path().join("corpus"),
			model_path: dir.path().join("model.bin"),
			vocab_path: dir.path().join("vocab.json"),
			merges_path: dir.path().join("merges.txt"),
			..GeneratorConfig::default()
		};
		let api = StoryGeneratorApi::ensure_model(&config).unwrap();
		let app = test::init_service(App::new().app_data(web::Data::new(api)).configure(routes)).await;
		let info: serde_json::Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/model-info").to_request()).await;
		assert_eq!(info["is_trained"], false);
	}
}
