use std::convert::Infallible;
use warp::{ws::Ws, Filter, Rejection, Reply};

use crate::{
	api::server::log_internal_server_error, controller::SharedController, observer::Observer,
	proof::Verifier, source::BlockSource,
};

mod handlers;
mod ws;

fn with_observer(
	observer: Observer,
) -> impl Filter<Extract = (Observer,), Error = Infallible> + Clone {
	warp::any().map(move || observer.clone())
}

fn with_controller<S: BlockSource, V: Verifier + 'static>(
	controller: SharedController<S, V>,
) -> impl Filter<Extract = (SharedController<S, V>,), Error = Infallible> + Clone {
	warp::any().map(move || controller.clone())
}

pub fn routes<S: BlockSource, V: Verifier + 'static>(
	observer: Observer,
	controller: SharedController<S, V>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
	let status = warp::path!("v1" / "status")
		.and(with_observer(observer.clone()))
		.map(handlers::status);

	let block = warp::path!("v1" / "block")
		.and(with_observer(observer.clone()))
		.map(handlers::block);

	let matrix = warp::path!("v1" / "matrix")
		.and(with_observer(observer.clone()))
		.map(handlers::matrix);

	let history = warp::path!("v1" / "history")
		.and(with_observer(observer.clone()))
		.map(handlers::history);

	let logs = warp::path!("v1" / "logs")
		.and(with_observer(observer.clone()))
		.map(handlers::logs);

	let ws = warp::path!("v1" / "ws")
		.and(warp::ws())
		.and(with_observer(observer.clone()))
		.map(|ws: Ws, observer: Observer| {
			ws.on_upgrade(move |web_socket| ws::connect(web_socket, observer))
		});

	let start = warp::path!("v1" / "start")
		.and(with_controller(controller.clone()))
		.and(with_observer(observer.clone()))
		.then(handlers::start::<S, V>)
		.map(log_internal_server_error);

	let stop = warp::path!("v1" / "stop")
		.and(with_controller(controller.clone()))
		.and(with_observer(observer.clone()))
		.then(handlers::stop::<S, V>)
		.map(log_internal_server_error);

	let network = warp::path!("v1" / "network" / String)
		.and(with_controller(controller))
		.and(with_observer(observer))
		.then(handlers::switch_network::<S, V>)
		.map(log_internal_server_error);

	let queries = warp::get().and(status.or(block).or(matrix).or(history).or(logs).or(ws));
	let commands = warp::post().and(start.or(stop).or(network));
	queries.or(commands)
}

#[cfg(test)]
mod tests {
	use super::routes;
	use crate::{
		controller::{RunController, SharedController},
		error::Error,
		network::Network,
		proof::MockVerifier,
		source::{BlockSource, Sink, SourceHandle},
		types::SamplerConfig,
	};
	use async_trait::async_trait;
	use serde_json::Value;
	use std::{sync::Arc, time::Duration};
	use test_case::test_case;
	use tokio::sync::Mutex;

	struct IdleSource;

	#[async_trait]
	impl BlockSource for IdleSource {
		async fn start(&self, _network: Network, sink: Sink) -> Result<SourceHandle, Error> {
			Ok(SourceHandle::detached(&sink))
		}
	}

	fn controller() -> SharedController<IdleSource, MockVerifier> {
		let config = SamplerConfig {
			cell_delay: Duration::ZERO,
			settle_delay: Duration::ZERO,
			..Default::default()
		};
		Arc::new(Mutex::new(RunController::new(
			IdleSource,
			MockVerifier::new(),
			Network::Turing,
			config,
		)))
	}

	fn json(body: &[u8]) -> Value {
		serde_json::from_slice(body).unwrap()
	}

	#[tokio::test]
	async fn status_route_initial() {
		let controller = controller();
		let observer = controller.lock().await.observer();
		let route = routes(observer, controller);

		let response = warp::test::request()
			.method("GET")
			.path("/v1/status")
			.reply(&route)
			.await;

		assert_eq!(response.status(), 200);
		assert_eq!(
			response.body(),
			r#"{"running":false,"network":"turing","processing":false,"state":"idle"}"#
		);
	}

	#[tokio::test]
	async fn block_route_not_found() {
		let controller = controller();
		let observer = controller.lock().await.observer();
		let route = routes(observer, controller);

		let response = warp::test::request()
			.method("GET")
			.path("/v1/block")
			.reply(&route)
			.await;
		assert_eq!(response.status(), 404);
	}

	#[test_case("/v1/matrix", r#"{"max_row":0,"max_col":0,"total_cell_count":0,"verified_cells":[]}"# ; "empty matrix")]
	#[test_case("/v1/history", "[]" ; "empty history")]
	#[test_case("/v1/logs", "[]" ; "empty logs")]
	#[tokio::test]
	async fn read_routes_before_start(path: &str, expected: &str) {
		let controller = controller();
		let observer = controller.lock().await.observer();
		let route = routes(observer, controller);

		let response = warp::test::request()
			.method("GET")
			.path(path)
			.reply(&route)
			.await;
		assert_eq!(response.status(), 200);
		assert_eq!(response.body(), expected);
	}

	#[tokio::test]
	async fn start_and_stop_routes() {
		let controller = controller();
		let observer = controller.lock().await.observer();
		let route = routes(observer.clone(), controller.clone());

		let response = warp::test::request()
			.method("POST")
			.path("/v1/start")
			.reply(&route)
			.await;
		assert_eq!(response.status(), 200);
		assert_eq!(json(response.body())["running"], true);
		assert!(observer.is_running());

		let response = warp::test::request()
			.method("GET")
			.path("/v1/logs")
			.reply(&route)
			.await;
		assert_eq!(json(response.body())[0]["message"], "Initiating sampler");

		let response = warp::test::request()
			.method("POST")
			.path("/v1/stop")
			.reply(&route)
			.await;
		assert_eq!(response.status(), 200);
		assert_eq!(json(response.body())["running"], false);
		assert!(!controller.lock().await.is_running());
	}

	#[test_case("mainnet", 200 ; "known network")]
	#[test_case("Local", 200 ; "case insensitive")]
	#[test_case("hex", 400 ; "unknown network")]
	#[tokio::test]
	async fn network_route(network: &str, expected_status: u16) {
		let controller = controller();
		let observer = controller.lock().await.observer();
		let route = routes(observer.clone(), controller);

		let response = warp::test::request()
			.method("POST")
			.path(&format!("/v1/network/{network}"))
			.reply(&route)
			.await;

		assert_eq!(response.status(), expected_status);
		assert!(!observer.is_running());
		if expected_status == 200 {
			assert_eq!(
				json(response.body())["network"],
				network.to_lowercase().as_str()
			);
		}
	}

	#[tokio::test]
	async fn ws_route_streams_events() {
		let controller = controller();
		let observer = controller.lock().await.observer();
		let route = routes(observer, controller.clone());

		let mut client = warp::test::ws()
			.path("/v1/ws")
			.handshake(route)
			.await
			.expect("handshake");

		let message = tokio::time::timeout(Duration::from_secs(5), async {
			loop {
				// keep producing events until the connection is subscribed
				controller
					.lock()
					.await
					.switch_network(Network::Local)
					.await
					.unwrap();
				let received =
					tokio::time::timeout(Duration::from_millis(50), client.recv()).await;
				if let Ok(message) = received {
					return message.expect("message");
				}
			}
		})
		.await
		.unwrap();

		let event: Value = serde_json::from_str(message.to_str().unwrap()).unwrap();
		assert!(["log", "network_selected"].contains(&event["type"].as_str().unwrap()));
	}
}
