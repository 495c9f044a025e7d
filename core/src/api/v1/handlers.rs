use color_eyre::eyre::eyre;
use warp::{reply::Json, Reply};

use crate::{
	api::types::{Error, Status},
	controller::SharedController,
	network::Network,
	observer::Observer,
	proof::Verifier,
	source::BlockSource,
};

pub fn status(observer: Observer) -> impl Reply {
	Status::new(&observer)
}

pub fn block(observer: Observer) -> Result<Json, Error> {
	observer
		.current_block()
		.map(|block| warp::reply::json(&block))
		.ok_or_else(|| Error::not_found("No block is being processed"))
}

pub fn matrix(observer: Observer) -> impl Reply {
	warp::reply::json(&observer.matrix())
}

pub fn history(observer: Observer) -> impl Reply {
	warp::reply::json(&observer.history())
}

pub fn logs(observer: Observer) -> impl Reply {
	warp::reply::json(&observer.logs())
}

pub async fn start<S: BlockSource, V: Verifier + 'static>(
	controller: SharedController<S, V>,
	observer: Observer,
) -> Result<Status, Error> {
	let mut controller = controller.lock().await;
	let network = controller.network();
	controller
		.start(network)
		.await
		.map_err(|error| Error::internal_server_error(eyre!(error)))?;
	Ok(Status::new(&observer))
}

pub async fn stop<S: BlockSource, V: Verifier + 'static>(
	controller: SharedController<S, V>,
	observer: Observer,
) -> Result<Status, Error> {
	controller.lock().await.stop().await;
	Ok(Status::new(&observer))
}

pub async fn switch_network<S: BlockSource, V: Verifier + 'static>(
	network: String,
	controller: SharedController<S, V>,
	observer: Observer,
) -> Result<Status, Error> {
	let network = Network::try_from(network).map_err(|message| Error::bad_request(&message))?;
	controller
		.lock()
		.await
		.switch_network(network)
		.await
		.map_err(|error| Error::internal_server_error(eyre!(error)))?;
	Ok(Status::new(&observer))
}
