use lambda_http::{Request, RequestPayloadExt, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::common::errors::Error;

const EMPTY_PAYLOAD_ERROR: &str = "Request payload is empty";

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .without_time() // CloudWatch will add the ingestion time
        .with_target(false)
        .init();
}

pub fn text_response(status: u16, body: impl Into<String>) -> Result<Response<String>, Error> {
    let response = Response::builder()
        .status(status)
        .header("content-type", "text/html")
        .body(body.into())?;

    Ok(response)
}

pub fn json_response<T: Serialize>(status: u16, body: &T) -> Result<Response<String>, Error> {
    let response = Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(serde_json::to_string(body)?)?;

    Ok(response)
}

/// Rejections come back as `Error::HttpError` carrying a 400 response.
pub fn extract_request<T: DeserializeOwned>(request: Request) -> Result<T, Error> {
    match request.payload::<T>() {
        Ok(Some(val)) => Ok(val),
        Ok(None) => Err(Error::HttpError(text_response(400, EMPTY_PAYLOAD_ERROR)?)),
        Err(err) => Err(Error::HttpError(text_response(400, err.to_string())?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::StackRequest;
    use lambda_http::Body;

    fn json_request(body: &str) -> Request {
        lambda_http::http::Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn extracts_json_payload() {
        let request: StackRequest = extract_request(json_request(r#"{"stackName":"demo"}"#)).unwrap();
        assert_eq!(request.stack_name, "demo");
    }

    #[test]
    fn empty_payload_is_bad_request() {
        let request = lambda_http::http::Request::builder()
            .method("POST")
            .body(Body::Empty)
            .unwrap();

        match extract_request::<StackRequest>(request) {
            Err(Error::HttpError(response)) => {
                assert_eq!(response.status(), 400);
                assert_eq!(response.body(), EMPTY_PAYLOAD_ERROR);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn malformed_payload_is_bad_request() {
        match extract_request::<StackRequest>(json_request(r#"{"stackName":"#)) {
            Err(Error::HttpError(response)) => assert_eq!(response.status(), 400),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
