//! Save/load endpoints
//!
//! `POST /mvix/save` stores the request body as the save blob, `POST /mvix/load`
//! returns it (or the literal `null` before the first save).

use crate::config::AppState;
use crate::http;
use crate::logger;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::Response;
use std::error::Error as StdError;

/// Body of a load before anything was saved
pub const EMPTY_SAVE: &[u8] = b"null";

type BoxError = Box<dyn StdError + Send + Sync>;

pub async fn handle_save<B>(body: B, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let limit = usize::try_from(state.config.http.max_body_size).unwrap_or(usize::MAX);

    let data = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            logger::log_warning(&format!("Save rejected: body exceeds {limit} bytes"));
            return http::build_413_response();
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read save body: {e}"));
            return http::build_400_response();
        }
    };

    // A save without payload is accepted and ignored
    if data.is_empty() {
        return http::build_ok_response();
    }

    match state.save_store.put(data).await {
        Ok(()) => http::build_ok_response(),
        Err(e) => {
            logger::log_error(&format!("Failed to write save data: {e}"));
            http::build_500_response()
        }
    }
}

pub async fn handle_load(state: &AppState) -> Response<Full<Bytes>> {
    match state.save_store.get().await {
        Ok(Some(data)) => http::build_text_response(data),
        Ok(None) => http::build_text_response(Bytes::from_static(EMPTY_SAVE)),
        Err(e) => {
            logger::log_error(&format!("Failed to read save data: {e}"));
            http::build_500_response()
        }
    }
}
