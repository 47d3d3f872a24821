//! WebSocket transport for editor sessions
//!
//! `GET /ws` upgrades to a session; `GET /document` returns the current
//! snapshot as JSON.

mod messages;
mod session;

pub use messages::{ClientOperation, OpKind, ServerMessage, WireError};
pub use session::{run_session, SessionError};

use std::convert::Infallible;

use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::sequencer::SequencerHandle;

/// All routes served for one document
pub fn routes(
    handle: SequencerHandle,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let ws = warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_sequencer(handle.clone()))
        .map(|ws: warp::ws::Ws, handle: SequencerHandle| {
            ws.on_upgrade(move |socket| run_session(socket, handle))
        });

    let document = warp::path("document")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_sequencer(handle))
        .and_then(handle_get_document);

    ws.or(document).with(warp::log("coedit::http"))
}

fn with_sequencer(
    handle: SequencerHandle,
) -> impl Filter<Extract = (SequencerHandle,), Error = Infallible> + Clone {
    warp::any().map(move || handle.clone())
}

async fn handle_get_document(handle: SequencerHandle) -> Result<impl Reply, Rejection> {
    let reply = match handle.snapshot().await {
        Ok(doc) => warp::reply::with_status(
            warp::reply::json(&ServerMessage::document(&doc)),
            StatusCode::OK,
        ),
        Err(e) => warp::reply::with_status(
            warp::reply::json(&ServerMessage::sequencer_error(&e)),
            StatusCode::SERVICE_UNAVAILABLE,
        ),
    };
    Ok(reply)
}
