//! The outbound side of a request.

use crate::error::NavError;

/// Sink that receives rendered output.
///
/// The engine writes only through its `print_out` hook; transports implement
/// this trait to carry the result to the client.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Response`",
    label = "missing `Response` implementation",
    note = "Response must implement `set_status`, `send` and `end`."
)]
pub trait Response: Send {
    /// Set the status code of the reply.
    fn set_status(&mut self, status: u16);

    /// Send a body with its content type.
    fn send(&mut self, content_type: &str, body: &str) -> Result<(), NavError>;

    /// Finish the reply.
    fn end(&mut self);
}

impl<R: Response + ?Sized> Response for Box<R> {
    fn set_status(&mut self, status: u16) {
        (**self).set_status(status);
    }

    fn send(&mut self, content_type: &str, body: &str) -> Result<(), NavError> {
        (**self).send(content_type, body)
    }

    fn end(&mut self) {
        (**self).end();
    }
}

/// A response that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResponse;

impl Response for NullResponse {
    fn set_status(&mut self, _status: u16) {}

    fn send(&mut self, _content_type: &str, _body: &str) -> Result<(), NavError> {
        Ok(())
    }

    fn end(&mut self) {}
}
