mod common;

use common::{codec, setup, Article};
use rusqlite::Connection;
use softkeep_core::{
    AdminGateway, Entity, Gateway, Lookup, QueryError, RecordStore, SqliteRecordStore, Visibility,
};

/// Seeds four articles; "gamma" is soft-deleted.
fn seed(conn: &Connection) -> Vec<Article> {
    let store = SqliteRecordStore::new(conn);
    let mut articles: Vec<Article> = ["alpha", "beta", "gamma", "delta"]
        .into_iter()
        .map(Article::new)
        .collect();
    for article in &mut articles {
        store.save(article).unwrap();
    }
    articles[2].delete(&store).unwrap();
    articles
}

fn titles(records: &[Article]) -> Vec<&str> {
    records.iter().map(|record| record.title.as_str()).collect()
}

#[test]
fn default_reads_hide_soft_deleted_rows() {
    let conn = setup();
    let codec = codec();
    seed(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();

    let visible = gateway.all().fetch().unwrap();
    assert_eq!(titles(&visible), vec!["alpha", "beta", "delta"]);
    assert_eq!(gateway.all().count().unwrap(), 3);
}

#[test]
fn explicit_deletion_filter_overrides_default_visibility() {
    let conn = setup();
    let codec = codec();
    seed(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();

    let deleted = gateway
        .filter(&Lookup::new().field("is_deleted", true))
        .unwrap()
        .fetch()
        .unwrap();
    assert_eq!(titles(&deleted), vec!["gamma"]);
}

#[test]
fn bare_and_exact_deletion_spellings_behave_the_same() {
    let conn = setup();
    let codec = codec();
    seed(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();

    for key in ["is_deleted", "is_deleted__exact"] {
        let deleted = gateway
            .filter(&Lookup::new().field(key, true))
            .unwrap()
            .fetch()
            .unwrap();
        assert_eq!(titles(&deleted), vec!["gamma"], "key {key}");

        let active = gateway
            .filter(&Lookup::new().field(key, false))
            .unwrap()
            .fetch()
            .unwrap();
        assert_eq!(titles(&active), vec!["alpha", "beta", "delta"], "key {key}");
    }
}

#[test]
fn any_deletion_predicate_opts_out_of_default_injection() {
    let conn = setup();
    let codec = codec();
    seed(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();

    let everything = gateway
        .filter(&Lookup::new().field_in("is_deleted__in", [true, false]))
        .unwrap();
    assert!(!everything.hides_deleted());
    assert_eq!(everything.count().unwrap(), 4);

    let not_active = gateway
        .exclude(&Lookup::new().field("is_deleted", false))
        .unwrap();
    assert_eq!(titles(&not_active.fetch().unwrap()), vec!["gamma"]);
}

#[test]
fn chained_predicates_cannot_bypass_visibility() {
    let conn = setup();
    let codec = codec();
    seed(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();

    let queryset = gateway
        .filter(&Lookup::new().field("title__startswith", "g"))
        .unwrap()
        .filter(&Lookup::by_pk(3))
        .unwrap();
    assert!(queryset.hides_deleted());
    assert!(queryset.fetch().unwrap().is_empty());
    assert!(queryset.to_sql().contains("\"is_deleted\" = 0"));
}

#[test]
fn get_by_hash_returns_the_record() {
    let conn = setup();
    let codec = codec();
    let articles = seed(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();

    let token = articles[1].opaque_id(&codec).unwrap();
    let fetched = gateway.get(&Lookup::by_hash(token)).unwrap();
    assert_eq!(fetched.title, "beta");
    assert_eq!(fetched.meta, articles[1].meta);
}

#[test]
fn get_by_garbage_hash_is_not_found() {
    let conn = setup();
    let codec = codec();
    seed(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();

    for garbage in ["", "not-a-token", "zzzzzzzzzzzz", "!!"] {
        let err = gateway.get(&Lookup::by_hash(garbage)).unwrap_err();
        assert!(
            matches!(err, QueryError::NotFound { table: "articles" }),
            "`{garbage}` gave {err}"
        );
        assert!(gateway
            .filter(&Lookup::by_hash(garbage))
            .unwrap()
            .fetch()
            .unwrap()
            .is_empty());
    }
}

#[test]
fn hash_lookup_composes_with_field_predicates() {
    let conn = setup();
    let codec = codec();
    let articles = seed(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();
    let token = articles[0].opaque_id(&codec).unwrap();

    let hit = gateway
        .get(&Lookup::by_hash(token.clone()).field("title", "alpha"))
        .unwrap();
    assert_eq!(hit.title, "alpha");

    let miss = gateway.get(&Lookup::by_hash(token).field("title", "beta"));
    assert!(matches!(miss, Err(QueryError::NotFound { .. })));
}

#[test]
fn hash_lookup_of_deleted_row_can_opt_in_explicitly() {
    let conn = setup();
    let codec = codec();
    let articles = seed(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();
    let token = articles[2].opaque_id(&codec).unwrap();

    assert!(gateway.get(&Lookup::by_hash(token.clone())).is_err());
    let deleted = gateway
        .get(&Lookup::by_hash(token).field("is_deleted", true))
        .unwrap();
    assert_eq!(deleted.title, "gamma");
}

#[test]
fn exclude_with_undecodable_hash_excludes_nothing() {
    let conn = setup();
    let codec = codec();
    seed(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();

    let remaining = gateway.exclude(&Lookup::by_hash("???")).unwrap();
    assert_eq!(remaining.count().unwrap(), 3);
}

#[test]
fn exclude_by_hash_drops_that_record() {
    let conn = setup();
    let codec = codec();
    let articles = seed(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();
    let token = articles[0].opaque_id(&codec).unwrap();

    let remaining = gateway.exclude(&Lookup::by_hash(token)).unwrap().fetch().unwrap();
    assert_eq!(titles(&remaining), vec!["beta", "delta"]);
}

#[test]
fn get_with_non_unique_lookup_reports_multiple_results() {
    let conn = setup();
    let codec = codec();
    seed(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();

    let err = gateway
        .get(&Lookup::new().field("title__contains", "a"))
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::MultipleResults {
            table: "articles",
            count: 3
        }
    ));
}

#[test]
fn query_sets_are_lazy_and_restartable() {
    let conn = setup();
    let codec = codec();
    seed(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();
    let store = SqliteRecordStore::new(&conn);

    let queryset = gateway
        .filter(&Lookup::new().field("title__startswith", "e"))
        .unwrap();
    assert!(queryset.fetch().unwrap().is_empty());

    let mut late = Article::new("epsilon");
    store.save(&mut late).unwrap();

    assert_eq!(titles(&queryset.fetch().unwrap()), vec!["epsilon"]);
    assert_eq!(titles(&queryset.fetch().unwrap()), vec!["epsilon"]);
}

#[test]
fn ordering_and_paging_are_applied() {
    let conn = setup();
    let codec = codec();
    seed(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();

    let by_title = gateway.all().order_by("-title").unwrap().fetch().unwrap();
    assert_eq!(titles(&by_title), vec!["delta", "beta", "alpha"]);

    let page = gateway.all().limit(1).offset(1).fetch().unwrap();
    assert_eq!(titles(&page), vec!["beta"]);

    let tail = gateway.all().offset(2).fetch().unwrap();
    assert_eq!(titles(&tail), vec!["delta"]);
    assert_eq!(gateway.all().limit(2).count().unwrap(), 2);

    let first = gateway.all().order_by("-pk").unwrap().first().unwrap().unwrap();
    assert_eq!(first.title, "delta");
}

#[test]
fn field_operators_filter_as_expected() {
    let conn = setup();
    let codec = codec();
    let articles = seed(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();

    let in_ids = gateway
        .filter(&Lookup::new().field_in("id__in", [1_i64, 2, 3]))
        .unwrap()
        .fetch()
        .unwrap();
    assert_eq!(titles(&in_ids), vec!["alpha", "beta"]);

    let no_ids = gateway
        .filter(&Lookup::new().field_in("id__in", Vec::<i64>::new()))
        .unwrap();
    assert!(!no_ids.exists().unwrap());

    let newer = gateway
        .filter(&Lookup::new().field("pk__gt", articles[0].meta.id))
        .unwrap()
        .fetch()
        .unwrap();
    assert_eq!(titles(&newer), vec!["beta", "delta"]);

    let without_body = gateway
        .filter(&Lookup::new().field("body__isnull", true))
        .unwrap();
    assert_eq!(without_body.count().unwrap(), 3);

    let not_alpha = gateway
        .filter(&Lookup::new().field("title__ne", "alpha"))
        .unwrap()
        .fetch()
        .unwrap();
    assert_eq!(titles(&not_alpha), vec!["beta", "delta"]);

    let case_sensitive = gateway
        .filter(&Lookup::new().field("title__contains", "ALPHA"))
        .unwrap();
    assert!(!case_sensitive.exists().unwrap());
}

#[test]
fn invalid_lookups_are_reported_not_panicked() {
    let conn = setup();
    let codec = codec();
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();

    let unknown_field = gateway.filter(&Lookup::new().field("author", "x"));
    assert!(matches!(unknown_field, Err(QueryError::InvalidLookup(_))));

    let unknown_op = gateway.filter(&Lookup::new().field("title__regex", "x"));
    assert!(matches!(unknown_op, Err(QueryError::InvalidLookup(_))));

    let bad_order = gateway.all().order_by("-author");
    assert!(matches!(bad_order, Err(QueryError::InvalidLookup(_))));
}

#[test]
fn gateways_start_from_distinct_visibilities() {
    let conn = setup();
    let codec = codec();
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();
    let admin = AdminGateway::<Article>::try_new(&conn, &codec).unwrap();

    assert_eq!(gateway.get_queryset().visibility(), Visibility::Default);
    assert_eq!(admin.get_queryset().visibility(), Visibility::All);
    assert!(!admin.get_queryset().to_sql().contains("is_deleted\" = 0"));
}

fn seed_with_bodies(conn: &Connection) {
    let store = SqliteRecordStore::new(conn);
    let mut with_body = Article::new("a");
    with_body.body = Some("x".to_string());
    store.save(&mut with_body).unwrap();
    store.save(&mut Article::new("b")).unwrap();
}

#[test]
fn exclude_keeps_rows_where_the_column_is_null() {
    let conn = setup();
    let codec = codec();
    seed_with_bodies(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();

    let by_value = gateway
        .exclude(&Lookup::new().field("body", "x"))
        .unwrap()
        .fetch()
        .unwrap();
    assert_eq!(titles(&by_value), vec!["b"]);

    let by_substring = gateway
        .exclude(&Lookup::new().field("body__contains", "x"))
        .unwrap()
        .fetch()
        .unwrap();
    assert_eq!(titles(&by_substring), vec!["b"]);

    let by_inequality = gateway
        .exclude(&Lookup::new().field("body__ne", "x"))
        .unwrap()
        .fetch()
        .unwrap();
    assert_eq!(titles(&by_inequality), vec!["a", "b"]);

    let by_pair = gateway
        .exclude(&Lookup::new().field("title", "b").field("body", "x"))
        .unwrap();
    assert_eq!(by_pair.count().unwrap(), 2);
}

#[test]
fn null_lookups_match_missing_values() {
    let conn = setup();
    let codec = codec();
    seed_with_bodies(&conn);
    let gateway = Gateway::<Article>::try_new(&conn, &codec).unwrap();

    let missing = gateway
        .filter(&Lookup::new().field("body", None::<&str>))
        .unwrap()
        .fetch()
        .unwrap();
    assert_eq!(titles(&missing), vec!["b"]);

    let is_null = gateway
        .filter(&Lookup::new().field("body__isnull", true))
        .unwrap()
        .fetch()
        .unwrap();
    assert_eq!(titles(&is_null), vec!["b"]);

    let not_null = gateway
        .filter(&Lookup::new().field("body__isnull", false))
        .unwrap()
        .fetch()
        .unwrap();
    assert_eq!(titles(&not_null), vec!["a"]);

    let present = gateway
        .exclude(&Lookup::new().field("body", None::<&str>))
        .unwrap()
        .fetch()
        .unwrap();
    assert_eq!(titles(&present), vec!["a"]);
}
