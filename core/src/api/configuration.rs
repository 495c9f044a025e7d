use color_eyre::{eyre::WrapErr, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Where the sampler status and control API listens. Loopback on port 7007
/// unless configured otherwise.
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct APIConfig {
	pub http_server_host: String,
	pub http_server_port: u16,
}

impl APIConfig {
	pub fn socket_addr(&self) -> Result<SocketAddr> {
		format!("{}:{}", self.http_server_host, self.http_server_port)
			.parse()
			.wrap_err("Unable to parse host address from config")
	}
}

impl Default for APIConfig {
	fn default() -> Self {
		APIConfig {
			http_server_host: "127.0.0.1".to_string(),
			http_server_port: 7007,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use test_case::test_case;

	#[test_case("127.0.0.1", 7007, Some("127.0.0.1:7007") ; "default loopback")]
	#[test_case("0.0.0.0", 80, Some("0.0.0.0:80") ; "any interface")]
	#[test_case("localhost", 7007, None ; "host names are not resolved")]
	fn socket_addr(host: &str, port: u16, expected: Option<&str>) {
		let config = APIConfig {
			http_server_host: host.to_string(),
			http_server_port: port,
		};
		let addr = config.socket_addr().ok().map(|addr| addr.to_string());
		assert_eq!(addr.as_deref(), expected);
	}
}
