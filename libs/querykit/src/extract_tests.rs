#[cfg(test)]
mod tests {
    use crate::extract::*;
    use axum::body::Body;
    use axum::extract::{FromRequest, FromRequestParts};
    use axum::http::Request;
    use query_core::{FilterExpression, FilterValue, Operator, OperatorFilter, Scalar, SortDirection};

    async fn from_uri(uri: &str) -> ListQuery {
        let req = Request::builder().uri(uri).body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        ListQuery::from_request_parts(&mut parts, &()).await.unwrap()
    }

    async fn from_body(uri: &str, body: &'static str) -> ListBody {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        ListBody::from_request(req, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_extracts_query_string() {
        let q = from_uri("/products?page=2&limit=5&sortBy=price&sortOrder=DESC&price[gte]=100").await;
        assert_eq!(q.page, 2);
        assert_eq!(q.limit, 5);
        assert_eq!(q.sort_field.as_deref(), Some("price"));
        assert_eq!(q.sort_direction, SortDirection::Descending);
        assert_eq!(
            q.filters.get("price"),
            Some(&FilterValue::Operators(vec![OperatorFilter::new(
                Operator::GreaterOrEqual,
                100i64
            )]))
        );
    }

    #[tokio::test]
    async fn test_missing_query_yields_defaults() {
        let q = from_uri("/products").await;
        assert_eq!(q.into_inner(), FilterExpression::default());
    }

    #[tokio::test]
    async fn test_hostile_query_never_rejects() {
        let q = from_uri("/products?page=-4&limit=9999&filters=%7Bbroken").await;
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 100);
        assert!(q.filters.is_empty());
    }

    #[tokio::test]
    async fn test_body_structured_map() {
        let b = from_body(
            "/products/search",
            r#"{"page":3,"searchTerm":"lamp","filters":{"brandId":"abc","price":{"operator":"lt","value":50}}}"#,
        )
        .await;
        assert_eq!(b.page, 3);
        assert_eq!(b.search_term.as_deref(), Some("lamp"));
        assert_eq!(
            b.filters.get("brandId"),
            Some(&FilterValue::Scalar(Scalar::Text("abc".into())))
        );
        assert_eq!(b.filters.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_body_uses_query_string() {
        let b = from_body("/products/search?limit=7", "").await;
        assert_eq!(b.limit, 7);
    }

    #[tokio::test]
    async fn test_non_json_body_yields_defaults() {
        let b = from_body("/products/search?limit=7", "page=4").await;
        assert_eq!(b.into_inner(), FilterExpression::default());
    }
}
