use base64::Engine;
use lyssna::backends::cloud;
use lyssna::error::ReaderError;

#[tokio::test]
async fn test_synthesize_decodes_audio_content() {
    let mut server = mockito::Server::new_async().await;
    let audio = b"ID3 not really an mp3";
    let encoded = base64::engine::general_purpose::STANDARD.encode(audio);

    let mock = server
        .mock("POST", "/text:synthesize")
        .match_query(mockito::Matcher::UrlEncoded("key".into(), "k123".into()))
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "input": { "text": "Hello there." },
            "voice": { "languageCode": "en-US", "name": "en-US-Wavenet-C" }
        })))
        .with_status(200)
        .with_body(format!("{{\"audioContent\":\"{}\"}}", encoded))
        .create_async()
        .await;

    let client = reqwest::Client::new();
    let bytes = cloud::synthesize(&client, &server.url(), "k123", "Hello there.", "en-US-Wavenet-C")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(bytes, audio);
}

#[tokio::test]
async fn test_synthesize_surfaces_api_error_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/text:synthesize")
        .match_query(mockito::Matcher::Any)
        .with_status(403)
        .with_body("{\"error\":{\"message\":\"API key expired\"}}")
        .create_async()
        .await;

    let client = reqwest::Client::new();
    let err = cloud::synthesize(&client, &server.url(), "bad", "Hi.", "sv-SE-Wavenet-A")
        .await
        .unwrap_err();

    match err {
        ReaderError::Synthesis(message) => assert!(message.contains("API key expired")),
        other => panic!("expected a synthesis error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_synthesize_rejects_response_without_audio() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/text:synthesize")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let client = reqwest::Client::new();
    let err = cloud::synthesize(&client, &server.url(), "k", "Hi.", "en-US-Wavenet-A")
        .await
        .unwrap_err();

    assert!(matches!(err, ReaderError::Synthesis(_)));
}

#[tokio::test]
async fn test_validate_api_key_accepts_a_working_key() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/voices")
        .match_query(mockito::Matcher::UrlEncoded("key".into(), "good".into()))
        .with_status(200)
        .with_body("{\"voices\":[]}")
        .create_async()
        .await;

    let client = reqwest::Client::new();
    cloud::validate_api_key(&client, &server.url(), "good")
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_validate_api_key_rejects_a_bad_key() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/voices")
        .match_query(mockito::Matcher::Any)
        .with_status(400)
        .with_body("{\"error\":{\"message\":\"API key not valid\"}}")
        .create_async()
        .await;

    let client = reqwest::Client::new();
    let err = cloud::validate_api_key(&client, &server.url(), "nope")
        .await
        .unwrap_err();

    match err {
        ReaderError::CredentialInvalid(message) => assert!(message.contains("API key not valid")),
        other => panic!("expected a credential error, got {:?}", other),
    }
}
