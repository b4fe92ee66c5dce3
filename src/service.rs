use std::sync::Arc;

use futures::{ future, Future, Stream };
use hyper::{
    header::{ AccessControlAllowOrigin, ContentLength, ContentType },
    server::{ Request, Response, Service },
    Chunk,
    Method,
    StatusCode,
};
use serde::{ de::{ self, DeserializeOwned }, Serialize };
use serde_json::Value;

use crate::{ error::Error, models::Message, storage::Storage };

const GREETING: &str = "Chatterbox API running";
const ALLOWED_METHODS: &str = "GET, POST, PATCH, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";

pub struct MicroService {
    storage: Arc<Storage>,
}

impl MicroService {
    pub fn new(storage: Arc<Storage>) -> MicroService {
        MicroService { storage }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Route {
    Index,
    Messages,
    Message(i32),
}

impl Route {
    fn parse(path: &str) -> Option<Route> {
        match path {
            "/" => Some(Route::Index),
            "/messages" | "/messages/" => Some(Route::Messages),
            _ =>
                path
                    .strip_prefix("/messages/")
                    .filter(|id| id.bytes().all(|byte| byte.is_ascii_digit()))
                    .and_then(|id| id.parse().ok())
                    .map(Route::Message),
        }
    }
}

impl Service for MicroService {
    type Request = Request;
    type Response = Response;
    type Error = hyper::Error;
    type Future = Box<dyn Future<Item = Self::Response, Error = Self::Error>>;

    fn call(&self, req: Request) -> Self::Future {
        info!("Microservice received a request {} {}", req.method(), req.path());
        let storage = Arc::clone(&self.storage);
        let method = req.method().clone();
        let route = Route::parse(req.path());

        let response: Self::Future = match (&method, route) {
            (&Method::Options, Some(_)) => Box::new(future::ok(make_preflight_response())),
            (&Method::Get, Some(Route::Index)) => {
                let payload = serde_json::json!({"message": GREETING});
                Box::new(future::ok(make_json_response(StatusCode::Ok, &payload)))
            }
            (&Method::Get, Some(Route::Messages)) => {
                Box::new(future::ok(list_messages(&storage)))
            }
            (&Method::Post, Some(Route::Messages)) => {
                let future = req
                    .body()
                    .concat2()
                    .map(move |chunk| create_message(&storage, &chunk));
                Box::new(future)
            }
            (&Method::Patch, Some(Route::Message(id))) => {
                let future = req
                    .body()
                    .concat2()
                    .map(move |chunk| update_message(&storage, id, &chunk));
                Box::new(future)
            }
            (&Method::Delete, Some(Route::Message(id))) => {
                Box::new(future::ok(delete_message(&storage, id)))
            }
            (_, Some(_)) => {
                Box::new(future::ok(make_error_response("Method not allowed", StatusCode::MethodNotAllowed)))
            }
            (_, None) => {
                Box::new(future::ok(make_error_response("Not found", StatusCode::NotFound)))
            }
        };

        Box::new(response.map(with_cors))
    }
}

/// JSON shape of a message as returned to clients.
#[derive(Debug, Serialize)]
struct MessageView<'a> {
    id: i32,
    body: &'a str,
    username: &'a str,
    created_at: String,
    updated_at: Option<String>,
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl<'a> From<&'a Message> for MessageView<'a> {
    fn from(message: &'a Message) -> Self {
        MessageView {
            id: message.id,
            body: &message.body,
            username: &message.username,
            created_at: message.created_at.format(TIMESTAMP_FORMAT).to_string(),
            updated_at: message.updated_at.map(|at| at.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

#[derive(Deserialize)]
struct NewMessagePayload {
    body: Option<String>,
    username: Option<String>,
}

#[derive(Default, Deserialize)]
struct MessagePatch {
    body: Option<String>,
}

/// Decodes a request body that must be a JSON object.
fn parse_object<T: DeserializeOwned>(chunk: &Chunk) -> Result<T, serde_json::Error> {
    match serde_json::from_slice::<Value>(chunk)? {
        value @ Value::Object(_) => serde_json::from_value(value),
        _ => Err(de::Error::custom("expected a JSON object")),
    }
}

fn list_messages(storage: &Storage) -> Response {
    match storage.list_all() {
        Ok(messages) => {
            let views: Vec<MessageView> = messages.iter().map(MessageView::from).collect();
            make_json_response(StatusCode::Ok, &views)
        }
        Err(error) => make_storage_error_response(&error),
    }
}

fn create_message(storage: &Storage, chunk: &Chunk) -> Response {
    let payload = match parse_object::<NewMessagePayload>(chunk) {
        Ok(payload) => payload,
        Err(error) => {
            debug!("Rejected message payload: {}", error);
            return make_storage_error_response(&Error::Validation);
        }
    };

    let (body, username) = match (payload.body, payload.username) {
        (Some(body), Some(username)) if !body.is_empty() && !username.is_empty() => {
            (body, username)
        }
        _ => {
            return make_storage_error_response(&Error::Validation);
        }
    };

    match storage.create(&body, &username) {
        Ok(message) => make_json_response(StatusCode::Created, &MessageView::from(&message)),
        Err(error) => make_storage_error_response(&error),
    }
}

/// A missing `body`, or an empty request, keeps the stored text and only
/// bumps `updated_at`. An unknown id wins over a malformed payload.
fn update_message(storage: &Storage, id: i32, chunk: &Chunk) -> Response {
    let patch = if chunk.is_empty() {
        MessagePatch::default()
    } else {
        match parse_object::<MessagePatch>(chunk) {
            Ok(patch) => patch,
            Err(error) => {
                debug!("Rejected patch for message {}: {}", id, error);
                return match storage.get(id) {
                    Ok(Some(_)) => make_error_response("Invalid JSON payload", StatusCode::BadRequest),
                    Ok(None) => make_storage_error_response(&Error::NotFound),
                    Err(error) => make_storage_error_response(&error),
                };
            }
        }
    };

    match storage.update(id, patch.body.as_deref()) {
        Ok(message) => make_json_response(StatusCode::Ok, &MessageView::from(&message)),
        Err(error) => make_storage_error_response(&error),
    }
}

fn delete_message(storage: &Storage, id: i32) -> Response {
    match storage.delete(id) {
        Ok(()) => Response::new().with_status(StatusCode::NoContent),
        Err(error) => make_storage_error_response(&error),
    }
}

fn make_storage_error_response(error: &Error) -> Response {
    match error {
        Error::Validation => make_error_response(&error.to_string(), StatusCode::BadRequest),
        Error::NotFound => make_error_response(&error.to_string(), StatusCode::NotFound),
        _ => {
            error!("Request failed: {}", error);
            make_error_response("Internal server error", StatusCode::InternalServerError)
        }
    }
}

fn make_json_response<T: Serialize>(status_code: StatusCode, value: &T) -> Response {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            debug!("{:?}", &payload);
            Response::new()
                .with_status(status_code)
                .with_header(ContentLength(payload.len() as u64))
                .with_header(ContentType::json())
                .with_body(payload)
        }
        Err(error) => {
            error!("Failed to serialize response: {}", error);
            make_error_response("Internal server error", StatusCode::InternalServerError)
        }
    }
}

fn make_error_response(error_message: &str, status_code: StatusCode) -> Response {
    if status_code.is_client_error() {
        warn!("Responding {} with {:?}", status_code, error_message);
    }
    let payload = serde_json::json!({"error": error_message}).to_string();
    Response::new()
        .with_status(status_code)
        .with_header(ContentLength(payload.len() as u64))
        .with_header(ContentType::json())
        .with_body(payload)
}

fn make_preflight_response() -> Response {
    let mut response = Response::new().with_status(StatusCode::NoContent);
    response.headers_mut().set_raw("Access-Control-Allow-Methods", ALLOWED_METHODS);
    response.headers_mut().set_raw("Access-Control-Allow-Headers", ALLOWED_HEADERS);
    response
}

fn with_cors(mut response: Response) -> Response {
    response.headers_mut().set(AccessControlAllowOrigin::Any);
    response
}
