mod common;
use common::*;

use bson::{Document, doc};
use shale_query::{ErrorCode, QueryConfig, parse_sort, sort_documents, sort_documents_with};

fn sorted(spec: Document) -> Vec<String> {
    let mut docs = accounts();
    sort_documents(&mut docs, &spec).unwrap();
    ids(&docs)
}

#[test]
fn numeric_keys_across_types() {
    // 72 and 72_i64 tie and keep input order; a missing score sorts as null
    assert_eq!(sorted(doc! { "score": -1 }), ["acct-1", "acct-3", "acct-5", "acct-2", "acct-4"]);
    assert_eq!(sorted(doc! { "score": 1 }), ["acct-4", "acct-2", "acct-3", "acct-5", "acct-1"]);
}

#[test]
fn compound_keys() {
    assert_eq!(
        sorted(doc! { "status": 1, "name": -1 }),
        ["acct-4", "acct-3", "acct-5", "acct-1", "acct-2"]
    );
}

#[test]
fn dotted_keys() {
    assert_eq!(
        sorted(doc! { "address.city": 1 }),
        ["acct-4", "acct-1", "acct-3", "acct-2", "acct-5"]
    );
}

#[test]
fn array_keys_use_smallest_element_ascending() {
    // acct-3 has an empty array, which sorts first
    assert_eq!(sorted(doc! { "tags": 1 }), ["acct-3", "acct-2", "acct-1", "acct-4", "acct-5"]);
}

#[test]
fn empty_spec_keeps_order() {
    assert_eq!(sorted(doc! {}), ["acct-1", "acct-2", "acct-3", "acct-4", "acct-5"]);
}

#[test]
fn invalid_specs() {
    let mut docs = accounts();

    let err = sort_documents(&mut docs, &doc! { "score": 2 }).unwrap_err();
    assert_eq!(err.code(), ErrorCode::SortBadOrder);

    let err = sort_documents(&mut docs, &doc! { "score": "up" }).unwrap_err();
    assert_eq!(err.code(), ErrorCode::SortBadValue);
    assert_eq!(err.message(), "Illegal key in $sort specification: score: up");

    let err = sort_documents(&mut docs, &doc! { "$score": 1 }).unwrap_err();
    assert_eq!(err.code(), ErrorCode::FieldPathInvalidName);

    // failed sorts leave the input untouched
    assert_eq!(ids(&docs), ["acct-1", "acct-2", "acct-3", "acct-4", "acct-5"]);
}

#[test]
fn sort_key_limit() {
    let config = QueryConfig { max_sort_keys: 2, ..QueryConfig::default() };
    let spec = doc! { "a": 1, "b": 1, "c": 1 };

    assert_eq!(parse_sort(&spec, &QueryConfig::default()).unwrap().len(), 3);
    let err = sort_documents_with(&mut accounts(), &spec, &config).unwrap_err();
    assert_eq!(err.code(), ErrorCode::BadValue);
    assert_eq!(err.message(), "maximum sort keys exceeded: 3");
}
