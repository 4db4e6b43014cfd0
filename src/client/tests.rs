use super::Client;
use crate::utils::error::ClientError;

#[test]
fn test_new_rejects_invalid_base_url() {
    let err = Client::new("not a url").unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[test]
fn test_endpoint_urls() {
    let client = Client::new("http://127.0.0.1:3140").unwrap();
    assert_eq!(
        client.url("/api/v1/topics/orders").unwrap().as_str(),
        "http://127.0.0.1:3140/api/v1/topics/orders"
    );
    // the collection root keeps its trailing slash
    assert_eq!(
        client.url("/api/v1/topics/").unwrap().as_str(),
        "http://127.0.0.1:3140/api/v1/topics/"
    );
}
