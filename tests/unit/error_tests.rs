use trackline::errors::PERSISTENCE_FAILURE_MESSAGE;
use trackline::protocol::validation::ValidationError;
use trackline::AppError;

#[test]
fn display_prefixes_identify_the_category() {
    let cases = [
        (AppError::Config("bad".into()), "config: bad"),
        (
            AppError::MalformedPayload("eof".into()),
            "malformed payload: eof",
        ),
        (
            AppError::SessionNotFound("s1".into()),
            "session not found: s1",
        ),
        (AppError::SessionInactive("s1".into()), "session inactive: s1"),
        (AppError::Persistence("locked".into()), "persistence: locked"),
        (AppError::Transport("reset".into()), "transport: reset"),
        (AppError::Io("denied".into()), "io: denied"),
    ];

    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn validation_error_converts_and_displays() {
    let err: AppError = ValidationError::InvalidLatitude(91.0).into();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::InvalidLatitude(_))
    ));
    assert_eq!(
        err.to_string(),
        "validation: latitude must be between -90 and 90, got 91"
    );
}

#[test]
fn persistence_details_are_hidden_from_clients() {
    let err = AppError::Persistence("UNIQUE constraint failed: tracking_session".into());
    assert_eq!(err.client_message(), PERSISTENCE_FAILURE_MESSAGE);
}

#[test]
fn other_errors_are_reported_verbatim() {
    let err = AppError::SessionInactive("s1".into());
    assert_eq!(err.client_message(), "session inactive: s1");
}

#[test]
fn toml_error_maps_to_config() {
    let toml_err = toml::from_str::<toml::Value>("= nope").expect_err("invalid toml");
    let err: AppError = toml_err.into();
    assert!(matches!(err, AppError::Config(_)));
}
