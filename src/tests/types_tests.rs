#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::error::AppError;
    use crate::types::*;

    #[test]
    fn test_create_book_request_trims() {
        let req = CreateBookRequest {
            title: " Faust ".into(),
            author: "Goethe".into(),
            topic: " Drama".into(),
            language: "German ".into(),
        };
        let book = req.validate().unwrap();
        assert_eq!(book.title, "Faust");
        assert_eq!(book.topic, "Drama");
        assert_eq!(book.language, "German");
    }

    #[test]
    fn test_create_book_request_limits() {
        let req = CreateBookRequest {
            title: "t".repeat(201),
            author: "a".into(),
            topic: "x".into(),
            language: "l".into(),
        };
        match req.validate() {
            Err(AppError::ValidationError { field, .. }) => assert_eq!(field, "title"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_update_book_request() {
        assert!(matches!(UpdateBookRequest::default().validate(), Err(AppError::BadRequest(_))));

        let changes = UpdateBookRequest { title: Some("  New ".into()), ..Default::default() }.validate().unwrap();
        assert_eq!(changes.title.as_deref(), Some("New"));
        assert!(changes.author.is_none());

        let blank = UpdateBookRequest { topic: Some(" ".into()), ..Default::default() };
        assert!(matches!(blank.validate(), Err(AppError::ValidationError { .. })));
    }

    #[test]
    fn test_book_query_validation() {
        assert!(BookQuery::default().validate().is_ok());
        assert!(BookQuery { limit: Some(MAX_PAGE_SIZE), ..Default::default() }.validate().is_ok());
        assert!(BookQuery { limit: Some(MAX_PAGE_SIZE + 1), ..Default::default() }.validate().is_err());
        assert!(BookQuery { limit: Some(0), ..Default::default() }.validate().is_err());
        assert!(BookQuery { offset: Some(-1), ..Default::default() }.validate().is_err());
        assert!(BookQuery { author: Some("x".repeat(201)), ..Default::default() }.validate().is_err());
    }

    #[test]
    fn test_review_requests() {
        let (content, rating) = CreateReviewRequest { content: " Fine ".into(), rating: 3 }.validate().unwrap();
        assert_eq!(content, "Fine");
        assert_eq!(rating, 3);
        assert!(CreateReviewRequest { content: "Fine".into(), rating: 6 }.validate().is_err());

        assert!(UpdateReviewRequest::default().validate().is_err());
        let changes = UpdateReviewRequest { rating: Some(2), ..Default::default() }.validate().unwrap();
        assert_eq!(changes.rating, Some(2));
        assert!(UpdateReviewRequest { rating: Some(0), ..Default::default() }.validate().is_err());
    }

    #[test]
    fn test_register_request() {
        let req = RegisterRequest { username: " alice ".into(), password: "long-enough".into() };
        assert_eq!(req.validate().unwrap(), "alice");
        let req = RegisterRequest { username: "alice".into(), password: "short".into() };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_banstatus_description_defaults() {
        let ban = UpdateBanstatusRequest { is_banned: true, description: None };
        assert_eq!(ban.validate().unwrap(), (true, "This user has been banned by an admin.".to_string()));

        let unban = UpdateBanstatusRequest { is_banned: false, description: None };
        assert_eq!(unban.validate().unwrap(), (false, DEFAULT_BAN_DESCRIPTION.to_string()));

        let custom = UpdateBanstatusRequest { is_banned: true, description: Some(" Spam ".into()) };
        assert_eq!(custom.validate().unwrap(), (true, "Spam".to_string()));

        let blank = UpdateBanstatusRequest { is_banned: true, description: Some("".into()) };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_format_average_rating() {
        assert_eq!(format_average_rating(None), "0.00");
        assert_eq!(format_average_rating(Some(4.5)), "4.50");
        assert_eq!(format_average_rating(Some(5.0)), "5.00");
        assert_eq!(format_average_rating(Some(2.0 / 3.0 + 1.0)), "1.67");
    }

    #[test]
    fn test_dto_serialization_is_camel_case() {
        let book = BookDto {
            id: "b1".into(),
            title: "Faust".into(),
            author: "Goethe".into(),
            topic: "Drama".into(),
            language: "German".into(),
            timestamp: "2024-01-01T00:00:00Z".into(),
            average_rating: "0.00".into(),
            is_taken: false,
            taken_by: None,
        };
        let value = serde_json::to_value(BookWithReviewsDto { book, reviews: vec![] }).unwrap();
        assert_eq!(value["averageRating"], "0.00");
        assert_eq!(value["isTaken"], false);
        assert!(value["takenBy"].is_null());
        assert_eq!(value["reviews"], json!([]));
        assert!(value.get("book").is_none());

        let envelope = serde_json::to_value(Envelope::new("done", 1)).unwrap();
        assert_eq!(envelope, json!({ "message": "done", "data": 1 }));
    }

    #[test]
    fn test_requests_ignore_unknown_fields() {
        let req: UpdateBanstatusRequest =
            serde_json::from_value(json!({ "isBanned": true, "userId": "someone" })).unwrap();
        assert!(req.is_banned);
        assert!(req.description.is_none());

        let req: CreateBookRequest = serde_json::from_value(
            json!({ "title": "T", "author": "A", "topic": "X", "language": "L", "isTaken": true }),
        )
        .unwrap();
        assert_eq!(req.title, "T");
    }
}
