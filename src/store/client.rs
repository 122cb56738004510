//! Blocking S3 transport
//!
//! Sends signed GET/PUT requests with `ureq` over rustls. HTTP status codes
//! come back as plain responses; only transport failures become errors here.

use crate::error::{WadError, WadResult};
use crate::store::config::StoreConfig;
use crate::store::request::{RequestBuilder, SignedRequest};
use crate::store::{Body, ObjectResponse, ObjectStore};
use chrono::Utc;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::debug;
use ureq::http::Response;
use ureq::{Agent, SendBody};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Object store client for one bucket
pub struct S3Client {
    requests: RequestBuilder,
    agent: Agent,
}

impl S3Client {
    pub fn new(config: StoreConfig) -> Self {
        let agent_config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(CONNECT_TIMEOUT))
            .build();

        Self {
            requests: RequestBuilder::new(config),
            agent: Agent::new_with_config(agent_config),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        self.requests.config()
    }

    fn sign(&self, verb: &str, key: &str, content_type: Option<&str>) -> WadResult<SignedRequest> {
        let request = self.requests.signed(verb, key, content_type, Utc::now())?;
        debug!("path={} signed_url={}", key, request.url);
        Ok(request)
    }

    fn send_get(&self, request: &SignedRequest) -> WadResult<Response<ureq::Body>> {
        let mut call = self.agent.get(request.url.as_str());
        for (name, value) in &request.headers {
            call = call.header(name.as_str(), value.as_str());
        }
        call.call().map_err(|e| WadError::request(&request.url, e))
    }

    fn send_put(&self, request: &SignedRequest, body: Body) -> WadResult<Response<ureq::Body>> {
        let mut call = self.agent.put(request.url.as_str());
        for (name, value) in &request.headers {
            call = call.header(name.as_str(), value.as_str());
        }

        let result = match body {
            // ureq sets Content-Length for in-memory bodies itself
            Body::Buffer(bytes) => call.send(&bytes[..]),
            Body::Stream {
                reader,
                known_length,
            } => {
                if let Some(length) = known_length {
                    call = call.header("Content-Length", length.to_string());
                }
                // Without a length ureq falls back to chunked transfer
                call.send(SendBody::from_owned_reader(reader))
            }
        };

        result.map_err(|e| WadError::request(&request.url, e))
    }
}

impl ObjectStore for S3Client {
    fn get(&self, key: &str) -> WadResult<ObjectResponse> {
        let request = self.sign("GET", key, None)?;
        let response = self.send_get(&request)?;
        let (mut object, body) = split_response(response);

        let mut reader = body.into_reader();
        let mut buffer = Vec::new();
        copy_body(&mut reader, &mut buffer, &request.url)?;
        object.body = buffer;

        Ok(object)
    }

    fn get_to(&self, key: &str, sink: &mut dyn Write) -> WadResult<ObjectResponse> {
        debug!("Trying to GET {}", key);
        let started = Instant::now();

        let request = self.sign("GET", key, None)?;
        let response = self.send_get(&request)?;
        let (mut object, body) = split_response(response);
        let mut reader = body.into_reader();

        if !object.is_success() {
            // Keep the error document for diagnostics, never hand it to the sink
            let mut buffer = Vec::new();
            copy_body(&mut reader, &mut buffer, &request.url)?;
            object.body = buffer;
            return Ok(object);
        }

        let bytes = copy_body(&mut reader, sink, &request.url)?;
        debug!(
            "Downloaded {} bytes in {} seconds",
            bytes,
            started.elapsed().as_secs()
        );

        Ok(object)
    }

    fn put(&self, key: &str, body: Body, content_type: Option<&str>) -> WadResult<ObjectResponse> {
        debug!("Trying to PUT {} ({:?})", key, body);
        let started = Instant::now();

        let request = self.sign("PUT", key, content_type)?;
        let response = self.send_put(&request, body)?;
        let (mut object, body) = split_response(response);

        let mut reader = body.into_reader();
        let mut buffer = Vec::new();
        copy_body(&mut reader, &mut buffer, &request.url)?;
        object.body = buffer;

        debug!("Uploaded in {} seconds", started.elapsed().as_secs());
        Ok(object)
    }
}

fn split_response(response: Response<ureq::Body>) -> (ObjectResponse, ureq::Body) {
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let object = ObjectResponse {
        status,
        headers,
        body: Vec::new(),
    };
    (object, response.into_body())
}

/// Copy a response body, telling read failures (transport) from write
/// failures (local disk).
fn copy_body(reader: &mut dyn Read, sink: &mut dyn Write, url: &str) -> WadResult<u64> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(WadError::request(url, e)),
        };

        sink.write_all(&buffer[..read])
            .map_err(|e| WadError::io("writing response body", e))?;
        total += read as u64;
    }

    sink.flush()
        .map_err(|e| WadError::io("flushing response body", e))?;
    Ok(total)
}
