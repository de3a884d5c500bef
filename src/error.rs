use std::fmt;

use rhai::{Dynamic, EvalAltResult, Position};

/// Script-visible error kind tag for an expired-request failure.
pub const EXPIRED_REQUEST_KIND: &str = "expired-request";

/// Script-visible error kind tag for a marshaling failure.
pub const MARSHAL_KIND: &str = "marshal";

/// Errors raised by the request bridge.
///
/// Both variants surface inside scripts as catchable runtime errors; neither
/// ever aborts the host process.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// An accessor was invoked after the request's handler returned.
    ///
    /// The pipeline unbinds the request slot the moment the handler
    /// invocation completes, so any retained `HttpRequest` value observes
    /// this error instead of stale data.
    ExpiredRequest,
    /// A value could not be converted between native bytes and script text.
    Marshal(MarshalError),
}

impl Error {
    /// Returns the script-visible kind tag for this error.
    ///
    /// Scripts catching a bridge error receive a map payload whose `kind`
    /// field carries this tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ExpiredRequest => EXPIRED_REQUEST_KIND,
            Error::Marshal(_) => MARSHAL_KIND,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ExpiredRequest => write!(
                f,
                "HttpRequest used after its handler returned; requests are only valid while the handler runs"
            ),
            Error::Marshal(e) => write!(f, "Marshal failure: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<MarshalError> for Error {
    fn from(e: MarshalError) -> Self {
        Error::Marshal(e)
    }
}

/// Converts a bridge error into a catchable script error.
///
/// The payload is a map with `kind` and `message` fields so scripts can
/// distinguish an expired request from a marshaling failure in `catch`.
impl From<Error> for Box<EvalAltResult> {
    fn from(err: Error) -> Self {
        let mut payload = rhai::Map::new();
        payload.insert("kind".into(), err.kind().into());
        payload.insert("message".into(), err.to_string().into());
        Box::new(EvalAltResult::ErrorRuntime(
            Dynamic::from_map(payload),
            Position::NONE,
        ))
    }
}

/// A failed conversion between native bytes and script text.
#[derive(Debug, PartialEq, Eq)]
pub struct MarshalError {
    /// Human-readable message explaining the failed conversion
    pub message: String,
}

impl MarshalError {
    /// Creates a new marshal error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for MarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for MarshalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_request_names_the_misuse() {
        let err = Error::ExpiredRequest;
        let msg = format!("{}", err);
        assert!(msg.contains("handler returned"));
        assert_eq!(err.kind(), "expired-request");
    }

    #[test]
    fn marshal_error_carries_message() {
        let err = Error::from(MarshalError::new("value is not valid UTF-8 text"));
        assert_eq!(err.kind(), "marshal");
        assert!(format!("{}", err).contains("not valid UTF-8"));
    }

    #[test]
    fn script_error_payload_is_a_tagged_map() {
        let script_err: Box<EvalAltResult> = Error::ExpiredRequest.into();

        match *script_err {
            EvalAltResult::ErrorRuntime(payload, _) => {
                let map = payload.cast::<rhai::Map>();
                assert_eq!(
                    map.get("kind").map(|k| k.clone().cast::<String>()),
                    Some("expired-request".to_string())
                );
                assert!(map.contains_key("message"));
            }
            other => panic!("expected runtime error, got: {:?}", other),
        }
    }
}
