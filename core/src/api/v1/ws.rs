use futures::{SinkExt, StreamExt};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, error, warn};
use warp::ws::{Message, WebSocket};

use crate::observer::Observer;

/// Forwards sampler events to the client as JSON text messages until either side closes.
pub async fn connect(web_socket: WebSocket, observer: Observer) {
	let (mut web_socket_sender, mut web_socket_receiver) = web_socket.split();
	let mut events = BroadcastStream::new(observer.subscribe());

	loop {
		tokio::select! {
			message = web_socket_receiver.next() => match message {
				None => break,
				Some(Ok(message)) if message.is_close() => break,
				Some(Ok(_)) => continue,
				Some(Err(error)) => {
					debug!(%error, event_type = "WS_CONNECT", "Error receiving client message");
					break;
				},
			},
			event = events.next() => {
				let event = match event {
					None => break,
					Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
						warn!(skipped, event_type = "WS_CONNECT", "Web socket client is lagging behind");
						continue;
					},
					Some(Ok(event)) => event,
				};
				let message = match serde_json::to_string(&event) {
					Ok(text) => Message::text(text),
					Err(error) => {
						error!(%error, "Failed to serialize event");
						continue;
					},
				};
				if let Err(error) = web_socket_sender.send(message).await {
					debug!(%error, event_type = "WS_CONNECT", "Error sending web socket message");
					break;
				}
			},
		}
	}
}
