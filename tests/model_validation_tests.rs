use restaurant_reviews::{
    error::ErrorBody,
    models::{
        Account, AccountView, CreateReviewRequest, Role, SignupRequest, UpdateReviewRequest,
        UpdateUserRequest,
    },
};
use validator::Validate;

fn signup(username: &str, email: Option<&str>, password: &str) -> SignupRequest {
    SignupRequest {
        username: username.to_string(),
        email: email.map(str::to_string),
        password: password.to_string(),
    }
}

fn review(rating: f64, comment: &str) -> CreateReviewRequest {
    CreateReviewRequest {
        rating,
        comment: comment.to_string(),
        restaurant_id: 1,
        user_id: 1,
    }
}

#[test]
fn test_signup_field_rules() {
    assert!(signup("alice", None, "secret1").validate().is_ok());
    assert!(signup("alice", Some("alice@example.com"), "secret1").validate().is_ok());

    assert!(signup("al", None, "secret1").validate().is_err());
    assert!(signup("alice", None, "abcd").validate().is_err());
    assert!(signup("alice", Some("not-an-email"), "secret1").validate().is_err());
}

#[test]
fn test_signup_errors_name_the_field() {
    let errors = signup("al", None, "abcd").validate().unwrap_err();
    let fields = errors.field_errors();
    assert!(fields.contains_key("username"));
    assert!(fields.contains_key("password"));
}

#[test]
fn test_review_rating_bounds() {
    assert!(review(1.0, "ok").validate().is_ok());
    assert!(review(5.0, "ok").validate().is_ok());
    assert!(review(0.0, "ok").validate().is_err());
    assert!(review(5.5, "ok").validate().is_err());
    assert!(review(3.0, "").validate().is_err());
}

#[test]
fn test_partial_updates_validate_only_present_fields() {
    assert!(UpdateUserRequest::default().validate().is_ok());
    assert!(UpdateReviewRequest::default().validate().is_ok());

    let short_password = UpdateUserRequest {
        password: Some("abc".to_string()),
        ..Default::default()
    };
    assert!(short_password.validate().is_err());

    let bad_rating = UpdateReviewRequest {
        rating: Some(9.0),
        ..Default::default()
    };
    assert!(bad_rating.validate().is_err());
}

#[test]
fn test_role_wire_format_is_lowercase() {
    assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "admin");
    assert_eq!(serde_json::from_str::<Role>("\"user\"").unwrap(), Role::User);
    assert!(serde_json::from_str::<Role>("\"root\"").is_err());
    assert_eq!(Role::default(), Role::User);
}

#[test]
fn test_account_view_never_exposes_hash() {
    let account = Account {
        id: 3,
        username: "alice".to_string(),
        email: None,
        password_hash: "$2b$04$secret".to_string(),
        role: Role::User,
    };

    let json = serde_json::to_value(AccountView::from(account)).unwrap();

    assert_eq!(json["id"], 3);
    assert!(json.get("password_hash").is_none());
    assert!(json.get("passwordHash").is_none());
}

#[test]
fn test_review_request_uses_camel_case() {
    let parsed: CreateReviewRequest = serde_json::from_value(serde_json::json!({
        "rating": 4,
        "comment": "Nice",
        "restaurantId": 2,
        "userId": 9
    }))
    .unwrap();

    assert_eq!(parsed.restaurant_id, 2);
    assert_eq!(parsed.user_id, 9);
}

#[test]
fn test_error_body_wire_shape() {
    let body = ErrorBody {
        status_code: 403,
        error: "FORBIDDEN".to_string(),
        message: "Forbidden".to_string(),
    };
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["statusCode"], 403);
    assert_eq!(json["error"], "FORBIDDEN");
}
