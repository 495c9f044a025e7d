use color_eyre::Report;
use serde::Serialize;
use warp::{http::StatusCode, reply::Reply};

use crate::{
	network::Network,
	observer::{CoordinatorState, Observer, RunState},
};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Status {
	pub running: bool,
	pub network: Network,
	pub processing: bool,
	pub state: CoordinatorState,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub block_number: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub confidence: Option<f64>,
}

impl Status {
	pub fn new(observer: &Observer) -> Self {
		let RunState { running, network } = observer.run_state();
		let sampling = observer.sampling_state();
		Status {
			running,
			network,
			processing: sampling.processing,
			state: sampling.state,
			block_number: sampling.current_block.as_ref().map(|block| block.number),
			confidence: sampling.current_block.as_ref().map(|block| block.confidence),
		}
	}
}

impl Reply for Status {
	fn into_response(self) -> warp::reply::Response {
		warp::reply::json(&self).into_response()
	}
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
	NotFound,
	BadRequest,
	InternalServerError,
}

#[derive(Serialize)]
pub struct Error {
	#[serde(skip)]
	pub cause: Option<Report>,
	pub error_code: ErrorCode,
	pub message: String,
}

impl Error {
	fn new(cause: Option<Report>, error_code: ErrorCode, message: &str) -> Self {
		Error {
			cause,
			error_code,
			message: message.to_string(),
		}
	}

	pub fn not_found(message: &str) -> Self {
		Self::new(None, ErrorCode::NotFound, message)
	}

	pub fn bad_request(message: &str) -> Self {
		Self::new(None, ErrorCode::BadRequest, message)
	}

	pub fn internal_server_error(cause: Report) -> Self {
		Self::new(
			Some(cause),
			ErrorCode::InternalServerError,
			"Internal Server Error",
		)
	}

	fn status(&self) -> StatusCode {
		match self.error_code {
			ErrorCode::NotFound => StatusCode::NOT_FOUND,
			ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
			ErrorCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl Reply for Error {
	fn into_response(self) -> warp::reply::Response {
		let status = self.status();
		warp::reply::with_status(self.message, status).into_response()
	}
}
