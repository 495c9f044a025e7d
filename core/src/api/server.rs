//! HTTP server exposing the sampler state and run control.
//!
//! # Endpoints
//!
//! * `/health` - liveness probe
//! * `/v1/status` - run state and the block being processed
//! * `/v1/block` - current block
//! * `/v1/matrix` - sampling matrix of the current block
//! * `/v1/history` - recent blocks, most recent last
//! * `/v1/logs` - user-facing log
//! * `/v1/start`, `/v1/stop`, `/v1/network/{network}` - run control
//! * `/v1/ws` - web socket stream of sampler events

use color_eyre::{eyre::WrapErr, Result};
use futures::Future;
use tracing::{error, info};
use warp::{Filter, Reply};

use super::{configuration::APIConfig, types::Error, v1};
use crate::{
	controller::SharedController, observer::Observer, proof::Verifier, shutdown::Monitor,
	source::BlockSource,
};

pub struct Server<S, V> {
	pub observer: Observer,
	pub controller: SharedController<S, V>,
	pub shutdown: Monitor,
}

fn health_route() -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
	warp::head()
		.or(warp::get())
		.and(warp::path("health"))
		.map(|_| warp::reply::with_status("", warp::http::StatusCode::OK))
}

impl<S: BlockSource, V: Verifier + 'static> Server<S, V> {
	/// Creates a HTTP server that needs to be spawned into a runtime
	pub fn bind(self, config: APIConfig) -> Result<impl Future<Output = ()>> {
		let addr = config.socket_addr()?;
		let v1_api = v1::routes(self.observer, self.controller);

		let cors = warp::cors()
			.allow_any_origin()
			.allow_header("content-type")
			.allow_methods(vec!["GET", "HEAD", "POST"]);

		let routes = health_route().or(v1_api).with(cors);

		// warp graceful shutdown expects a signal that is [`Future<Output = ()>`]
		let monitor = self.shutdown;
		let shutdown_signal = async move { monitor.canceled().await };
		let (addr, server) = warp::serve(routes)
			.try_bind_with_graceful_shutdown(addr, shutdown_signal)
			.wrap_err("Unable to bind HTTP server")?;

		info!("HTTP server running on http://{addr}");
		Ok(server)
	}
}

pub fn log_internal_server_error(result: Result<impl Reply, Error>) -> Result<impl Reply, Error> {
	if let Err(Error {
		cause: Some(error),
		message,
		..
	}) = result.as_ref()
	{
		error!("{message}: {error:#}");
	}
	result
}
