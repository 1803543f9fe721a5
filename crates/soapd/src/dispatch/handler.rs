//! Connection handler that serves SOAP over HTTP.
//!
//! One request per connection. `POST` bodies go through the codec and the
//! dispatcher; `GET` serves the `wsdl` method or a fixed help page; other
//! verbs get a bare 501. The write half is closed after the response.

use std::sync::Arc;

use http::{Method, StatusCode};
use soap_config::DumpSettings;
use tracing::{debug, warn};

use super::dispatcher::Dispatcher;
use super::response::ResponseEnvelope;
use super::{DISPATCH_TARGET, WIRE_TARGET};
use crate::codec::{CodecError, EnvelopeCodec};
use crate::envelope::TransportMeta;
use crate::transport::http::{
    self as framing, HttpRequest, HttpResponse, bare_response, header_pairs, typed_response,
};
use crate::transport::{ConnectionHandler, ConnectionStream};

const SOAP_ACTION: &str = "soapaction";

/// Body returned for GET requests that do not fetch a WSDL document.
pub const GET_HELP_PAGE: &str = "<title>\n<head>Error!</head>\n</title>\n\n<body>\n<h1>Oops!</h1>\n\n<p>\n  This server supports HTTP GET requests only for the purpose of\n  obtaining Web Services Description Language (WSDL) for a specific\n  service.\n\n  Either you requested an URL that does not end in \"wsdl\" or this\n  server does not implement a wsdl method.\n</p>\n\n</body>";

/// Serves SOAP requests arriving on accepted connections.
pub struct SoapConnectionHandler {
    dispatcher: Dispatcher,
    codec: Arc<dyn EnvelopeCodec>,
    encoding: String,
    dump: DumpSettings,
}

impl SoapConnectionHandler {
    /// Creates a handler answering in `encoding`.
    #[must_use]
    pub fn new(
        dispatcher: Dispatcher,
        codec: Arc<dyn EnvelopeCodec>,
        encoding: impl Into<String>,
        dump: DumpSettings,
    ) -> Self {
        Self {
            dispatcher,
            codec,
            encoding: encoding.into(),
            dump,
        }
    }

    fn serve(&self, mut stream: ConnectionStream) {
        let peer = stream.peer();
        let request = match framing::read_request(&mut stream) {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!(target: DISPATCH_TARGET, %peer, "client disconnected without request");
                return;
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %peer, %error, "failed to read request");
                self.respond(&mut stream, &bare_response(StatusCode::INTERNAL_SERVER_ERROR));
                return;
            }
        };
        if self.dump.headers_in {
            debug!(
                target: WIRE_TARGET,
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
                headers = ?request.headers(),
                "incoming HTTP headers"
            );
        }

        let response = match *request.method() {
            Method::POST => self.post(&request, peer),
            Method::GET => self.get(&request),
            ref other => {
                debug!(target: DISPATCH_TARGET, method = %other, "unsupported HTTP method");
                bare_response(StatusCode::NOT_IMPLEMENTED)
            }
        };
        self.respond(&mut stream, &response);
    }

    fn post(&self, request: &HttpRequest, peer: String) -> HttpResponse {
        if self.dump.soap_in {
            debug!(
                target: WIRE_TARGET,
                body = %String::from_utf8_lossy(request.body()),
                "incoming SOAP"
            );
        }
        let transport = TransportMeta {
            peer,
            soap_action: request
                .headers()
                .get(SOAP_ACTION)
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned()),
            http_headers: header_pairs(request),
        };
        let response = match self.codec.decode(request.body(), transport) {
            Ok(envelope) => {
                debug!(
                    target: DISPATCH_TARGET,
                    method = %envelope.qualified_method(),
                    "dispatching request"
                );
                self.dispatcher.dispatch(&envelope)
            }
            Err(CodecError::Fault(fault)) => {
                debug!(target: DISPATCH_TARGET, %fault, "codec rejected envelope");
                ResponseEnvelope::Fault(fault)
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to decode envelope");
                return bare_response(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        match self.codec.encode(&response, &self.encoding) {
            Ok(body) => {
                if self.dump.soap_out {
                    debug!(
                        target: WIRE_TARGET,
                        body = %String::from_utf8_lossy(&body),
                        "outgoing SOAP"
                    );
                }
                self.typed(response.status(), &self.content_type(), body)
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to encode response");
                bare_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    fn get(&self, request: &HttpRequest) -> HttpResponse {
        if request.uri().to_string().to_lowercase().ends_with("wsdl") {
            match self.dispatcher.fetch_wsdl() {
                Ok(Some(text)) => {
                    return self.typed(StatusCode::OK, "text/plain", text.into_bytes());
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %error, "wsdl handler failed");
                    return bare_response(StatusCode::INTERNAL_SERVER_ERROR);
                }
            }
        }
        self.typed(StatusCode::OK, "text/html", GET_HELP_PAGE.as_bytes().to_vec())
    }

    fn typed(&self, status: StatusCode, content_type: &str, body: Vec<u8>) -> HttpResponse {
        typed_response(status, content_type, body).unwrap_or_else(|error| {
            warn!(
                target: DISPATCH_TARGET,
                %error,
                encoding = %self.encoding,
                "failed to build response"
            );
            bare_response(StatusCode::INTERNAL_SERVER_ERROR)
        })
    }

    fn content_type(&self) -> String {
        format!("text/xml; charset=\"{}\"", self.encoding)
    }

    fn respond(&self, stream: &mut ConnectionStream, response: &HttpResponse) {
        if self.dump.headers_out {
            debug!(
                target: WIRE_TARGET,
                status_line = %framing::status_line(response),
                headers = ?response.headers(),
                "outgoing HTTP headers"
            );
        }
        if let Err(error) = framing::write_response(stream, response) {
            warn!(target: DISPATCH_TARGET, %error, "failed to write response");
            return;
        }
        if let Err(error) = stream.finish() {
            debug!(target: DISPATCH_TARGET, %error, "failed to close connection");
        }
    }
}

impl ConnectionHandler for SoapConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        self.serve(stream);
    }
}
