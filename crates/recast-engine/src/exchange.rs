//! The host-facing exchange handle.
//!
//! The engine never talks to the network itself; the hosting proxy hands it
//! an exchange implementing this trait once the request headers are complete
//! and again once the full response has been read.

use hyper::{HeaderMap, Method, StatusCode};

/// One intercepted HTTP exchange, as exposed by the hosting proxy.
pub trait HttpExchange {
    /// Destination host, without the port.
    fn request_host(&self) -> &str;

    /// Request path component (no query string).
    fn request_path(&self) -> &str;

    fn request_method(&self) -> &Method;

    fn response_status(&self) -> StatusCode;

    fn set_response_status(&mut self, status: StatusCode);

    fn response_headers_mut(&mut self) -> &mut HeaderMap;

    fn response_body(&self) -> &[u8];

    fn set_response_body(&mut self, body: Vec<u8>);

    /// Request URL used in operator-facing log messages.
    fn request_url(&self) -> String {
        format!("{}{}", self.request_host(), self.request_path())
    }

    /// Response body decoded as text, lossily.
    fn response_body_text(&self) -> String {
        String::from_utf8_lossy(self.response_body()).into_owned()
    }
}
