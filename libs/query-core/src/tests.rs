#[cfg(test)]
#[allow(clippy::module_inception)]
mod tests {
    use crate::{
        assemble, FilterExpression, FilterMap, FilterValue, Operand, Operator, OperatorFilter,
        Page, QueryBuilder, Scalar, SortDirection, DEFAULT_LIMIT, MAX_LIMIT,
    };
    use serde_json::json;

    #[test]
    fn test_page_zero_is_coerced_to_one() {
        let expr = FilterExpression::from_value(json!({"page": 0}));
        assert_eq!(expr.page, 1);

        let expr = FilterExpression::from_query_string("page=-3");
        assert_eq!(expr.page, 1);
    }

    #[test]
    fn test_limit_clamping_policy() {
        assert_eq!(
            FilterExpression::from_value(json!({"limit": 0})).limit,
            DEFAULT_LIMIT
        );
        assert_eq!(
            FilterExpression::from_value(json!({"limit": 1000})).limit,
            MAX_LIMIT
        );
        assert_eq!(FilterExpression::from_query_string("limit=37").limit, 37);
        assert_eq!(
            FilterExpression::from_query_string("limit=lots").limit,
            DEFAULT_LIMIT
        );
        assert_eq!(
            FilterExpression::from_value(json!({"limit": "25"})).limit,
            25
        );
    }

    #[test]
    fn test_defaults_for_empty_input() {
        let expr = FilterExpression::from_query_string("");
        assert_eq!(expr, FilterExpression::default());
        assert_eq!(expr.sort_direction, SortDirection::Descending);

        let expr = FilterExpression::from_value(json!(["not", "an", "object"]));
        assert_eq!(expr, FilterExpression::default());
    }

    #[test]
    fn test_documented_query_string() {
        let expr = FilterExpression::from_query_string(
            "?page=2&limit=20&sortBy=createdAt&sortOrder=DESC&search=foo\
             &brandId=abc123&price[gte]=100000&price[lte]=500000\
             &color[in][]=red&color[in][]=blue\
             &startDate[between][]=2024-01-01&startDate[between][]=2024-01-31",
        );

        assert_eq!(expr.page, 2);
        assert_eq!(expr.limit, 20);
        assert_eq!(expr.sort_field.as_deref(), Some("createdAt"));
        assert_eq!(expr.sort_direction, SortDirection::Descending);
        assert_eq!(expr.search_term.as_deref(), Some("foo"));
        assert_eq!(
            expr.filters.get("brandId"),
            Some(&FilterValue::Scalar(Scalar::Text("abc123".into())))
        );
        assert_eq!(
            expr.filters.get("price"),
            Some(&FilterValue::Operators(vec![
                OperatorFilter::new(Operator::GreaterOrEqual, 100000i64),
                OperatorFilter::new(Operator::LessOrEqual, 500000i64),
            ]))
        );
        assert_eq!(
            expr.filters.get("color"),
            Some(&FilterValue::Operators(vec![OperatorFilter::new(
                Operator::In,
                vec!["red", "blue"]
            )]))
        );
        assert_eq!(
            expr.filters.get("startDate"),
            Some(&FilterValue::Operators(vec![OperatorFilter::new(
                Operator::Between,
                ("2024-01-01", "2024-01-31")
            )]))
        );
    }

    #[test]
    fn test_json_filters_match_bracket_notation() {
        let blob = r#"{"brandId":"abc123","price":{"operator":"gte","value":100000}}"#;
        let from_json =
            FilterExpression::from_query_string(&format!("filters={}", urlencoding::encode(blob)));
        let from_brackets = FilterExpression::from_query_string("brandId=abc123&price[gte]=100000");

        assert_eq!(from_json, from_brackets);
        assert_eq!(from_json.filters.len(), 2);
    }

    #[test]
    fn test_filters_blob_fallback_chain() {
        // structured: bracket keys under `filters`
        let expr = FilterExpression::from_query_string("filters[brandId]=abc");
        assert_eq!(
            expr.filters.get("brandId"),
            Some(&FilterValue::Scalar(Scalar::Text("abc".into())))
        );

        // bracket: a query string embedded as the value
        let expr = FilterExpression::from_query_string("filters=brandId%3Dabc%26price%5Bgt%5D%3D5");
        assert_eq!(expr.filters.len(), 2);

        // garbage: nothing usable, no failure
        let expr = FilterExpression::from_query_string("filters=%7Bnot-json&page=3");
        assert!(expr.filters.is_empty());
        assert_eq!(expr.page, 3);

        // JSON that is not an object
        let expr = FilterExpression::from_value(json!({"filters": "[1,2,3]"}));
        assert!(expr.filters.is_empty());
    }

    #[test]
    fn test_filters_blob_entries_merge_after_top_level() {
        let expr = FilterExpression::from_value(json!({
            "status": "open",
            "brandId": "a",
            "filters": {"brandId": "b"}
        }));
        let fields: Vec<&str> = expr.filters.iter().map(|(k, _)| k).collect();
        assert_eq!(fields, vec!["status", "brandId"]);
        assert_eq!(
            expr.filters.get("brandId"),
            Some(&FilterValue::Scalar(Scalar::Text("b".into())))
        );
    }

    #[test]
    fn test_sort_and_search_aliases() {
        let expr = FilterExpression::from_query_string(
            "sortField=name&sortDirection=ascending&searchTerm=%20%20shoes%20",
        );
        assert_eq!(expr.sort_field.as_deref(), Some("name"));
        assert_eq!(expr.sort_direction, SortDirection::Ascending);
        assert_eq!(expr.search_term.as_deref(), Some("shoes"));

        let expr = FilterExpression::from_query_string("sortOrder=sideways&search=%20");
        assert_eq!(expr.sort_direction, SortDirection::Descending);
        assert_eq!(expr.search_term, None);
    }

    #[test]
    fn test_dot_and_bracket_nesting_agree() {
        let dotted = FilterExpression::from_query_string("user.role=admin");
        let bracketed = FilterExpression::from_query_string("user[role]=admin");
        assert_eq!(dotted, bracketed);

        let mut inner = FilterMap::new();
        inner.insert("role", "admin".into());
        assert_eq!(
            bracketed.filters.get("user"),
            Some(&FilterValue::Nested(inner))
        );
    }

    #[test]
    fn test_builder_clamps_instead_of_failing() {
        let expr = QueryBuilder::new().page(0).limit(0).build();
        assert_eq!(expr.page, 1);
        assert_eq!(expr.limit, DEFAULT_LIMIT);

        let expr = QueryBuilder::new().limit(5000).search("   ").build();
        assert_eq!(expr.limit, MAX_LIMIT);
        assert_eq!(expr.search_term, None);
    }

    #[test]
    fn test_builder_encodes_canonical_order() {
        let qs = QueryBuilder::new()
            .page(2)
            .limit(20)
            .sort("createdAt", SortDirection::Descending)
            .search("foo")
            .filter("brandId", "abc123")
            .filter_op("price", Operator::GreaterOrEqual, 100000)
            .filter_op("price", Operator::LessOrEqual, 500000)
            .filter_op("color", Operator::In, vec!["red", "blue"])
            .filter_op("startDate", Operator::Between, ("2024-01-01", "2024-01-31"))
            .to_query_string();

        assert_eq!(
            qs,
            "page=2&limit=20&sortBy=createdAt&sortOrder=DESC&search=foo&brandId=abc123\
             &price[gte]=100000&price[lte]=500000&color[in][]=red&color[in][]=blue\
             &startDate[between][]=2024-01-01&startDate[between][]=2024-01-31"
        );
    }

    #[test]
    fn test_builder_same_operator_keeps_last_value() {
        let expr = QueryBuilder::new()
            .filter_op("price", Operator::GreaterThan, 1)
            .filter_op("price", Operator::GreaterThan, 2)
            .build();
        assert_eq!(
            expr.filters.get("price"),
            Some(&FilterValue::Operators(vec![OperatorFilter::new(
                Operator::GreaterThan,
                2
            )]))
        );
    }

    #[test]
    fn test_builder_without_filter() {
        let expr = QueryBuilder::new()
            .filter("a", 1)
            .filter("b", 2)
            .without_filter("a")
            .build();
        assert!(expr.filters.get("a").is_none());
        assert_eq!(expr.filters.len(), 1);
    }

    #[test]
    fn test_reserved_field_names_survive_encoding() {
        let expr = QueryBuilder::new().filter("page", "front").build();
        let qs = expr.to_query_string();
        assert!(qs.contains("filters[page]=front"), "{}", qs);
        assert_eq!(FilterExpression::from_query_string(&qs), expr);
    }

    #[test]
    fn test_scalar_inference() {
        assert_eq!(Scalar::infer("42"), Scalar::Int(42));
        assert_eq!(Scalar::infer("-7"), Scalar::Int(-7));
        assert_eq!(Scalar::infer("2.5"), Scalar::Float(2.5));
        assert_eq!(Scalar::infer("true"), Scalar::Bool(true));
        assert_eq!(Scalar::infer("007"), Scalar::Text("007".into()));
        assert_eq!(Scalar::infer("1e3x"), Scalar::Text("1e3x".into()));
        assert_eq!(Scalar::infer("NaN"), Scalar::Text("NaN".into()));
        assert_eq!(
            Scalar::infer("99999999999999999999"),
            Scalar::Text("99999999999999999999".into())
        );
        assert_eq!(Scalar::infer(&Scalar::Float(1.0).to_wire()), Scalar::Float(1.0));
    }

    #[test]
    fn test_non_canonical_numbers_keep_their_spelling() {
        assert_eq!(Scalar::infer("1.5"), Scalar::Float(1.5));
        assert_eq!(Scalar::infer("100"), Scalar::Int(100));
        assert_eq!(Scalar::infer("1e-6"), Scalar::Float(1e-6));
        for raw in ["1.50", "1e3", "-0", "2.0e1", "10.0000"] {
            assert_eq!(Scalar::infer(raw), Scalar::Text(raw.into()), "{raw}");
            assert_eq!(Scalar::infer(raw).to_wire(), raw);
        }
    }

    #[test]
    fn test_operator_tokens() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_token(op.as_token()), Some(op));
        }
        assert_eq!(
            Operator::from_token("greaterOrEqual"),
            Some(Operator::GreaterOrEqual)
        );
        assert_eq!(Operator::from_token("LessThan"), Some(Operator::LessThan));
        assert_eq!(Operator::from_token("ne"), Some(Operator::Not));
        assert_eq!(Operator::from_token("approximately"), None);
    }

    #[test]
    fn test_operand_shapes() {
        assert_eq!(
            Operand::from(("a", "b")),
            Operand::List(vec![Scalar::Text("a".into()), Scalar::Text("b".into())])
        );
        assert_eq!(Operand::from(3), Operand::Scalar(Scalar::Int(3)));
    }

    #[test]
    fn test_page_meta_middle_page() {
        let page = assemble(vec![0u8; 7], 57, 2, 20);
        assert_eq!(page.data.len(), 7);
        assert_eq!(page.meta.total_pages, 3);
        assert!(page.meta.has_next);
        assert!(page.meta.has_prev);
    }

    #[test]
    fn test_page_meta_empty() {
        let page: Page<u8> = assemble(Vec::new(), 0, 1, 10);
        assert_eq!(page.meta.total_pages, 0);
        assert!(!page.meta.has_next);
        assert!(!page.meta.has_prev);
    }

    #[test]
    fn test_page_meta_last_page_and_limit_change() {
        let last = Page::assemble(vec!["x"; 17], 57, 3, 20);
        assert!(!last.meta.has_next);
        assert!(last.meta.has_prev);

        // Same listing, different limit: recomputed from scratch.
        let resized = Page::assemble(vec!["x"; 10], 57, 3, 10);
        assert_eq!(resized.meta.total_pages, 6);
        assert!(resized.meta.has_next);
    }

    #[test]
    fn test_page_envelope_json() {
        let page = Page::assemble(vec![1, 2], 57, 2, 20).map_items(|n| n * 10);
        let v = serde_json::to_value(&page).unwrap();
        assert_eq!(
            v,
            json!({
                "data": [10, 20],
                "meta": {
                    "total": 57, "page": 2, "limit": 20,
                    "totalPages": 3, "hasNext": true, "hasPrev": true
                }
            })
        );
    }
}
