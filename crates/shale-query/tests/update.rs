mod common;
use common::*;

use bson::{Bson, Document, bson, doc};
use shale_query::{ErrorCode, QueryConfig, UpdateMode, filter_document, update_document, update_document_with};

fn account(id: &str) -> Document {
    accounts()
        .into_iter()
        .find(|d| d.get_str("_id").unwrap() == id)
        .unwrap()
}

// ── Field operators ─────────────────────────────────────────────

#[test]
fn set_and_inc_then_filter() {
    let mut doc = account("acct-1");
    let update = doc! { "$set": { "address.zip": "78702" }, "$inc": { "score": 2 } };
    assert!(update_document(&mut doc, &update).unwrap());

    assert_eq!(doc.get("score"), Some(&bson!(93)));
    assert!(filter_document(&doc, &doc! { "address.zip": "78702", "score": { "$gt": 92 } }).unwrap());
}

#[test]
fn mul_keeps_wider_type() {
    let mut doc = account("acct-3");
    assert!(update_document(&mut doc, &doc! { "$mul": { "score": 2 } }).unwrap());
    assert_eq!(doc.get("score"), Some(&Bson::Int64(144)));
}

#[test]
fn min_and_max_compare_across_numeric_types() {
    let mut doc = account("acct-2");
    assert!(!update_document(&mut doc, &doc! { "$min": { "score": 50 } }).unwrap());
    assert!(update_document(&mut doc, &doc! { "$max": { "score": 50 } }).unwrap());
    assert_eq!(doc.get("score"), Some(&bson!(50)));
}

#[test]
fn rename_and_unset() {
    let mut doc = account("acct-3");
    assert!(update_document(&mut doc, &doc! { "$rename": { "address": "location" }, "$unset": { "tags": "" } }).unwrap());
    assert!(!doc.contains_key("address"));
    assert!(!doc.contains_key("tags"));
    assert_eq!(doc.get_document("location").unwrap(), &doc! { "city": "Austin" });
}

#[test]
fn unset_array_element_leaves_null() {
    let mut doc = account("acct-2");
    assert!(update_document(&mut doc, &doc! { "$unset": { "contacts.0": 1 } }).unwrap());
    assert_eq!(doc.get("contacts"), Some(&bson!([null])));
}

#[test]
fn no_op_update_reports_unchanged() {
    let mut doc = account("acct-3");
    let before = doc.clone();
    let update = doc! { "$set": { "status": "active" }, "$unset": { "contacts": 1 }, "$pull": { "tags": "x" } };
    assert!(!update_document(&mut doc, &update).unwrap());
    assert_eq!(doc, before);
}

// ── Array operators ─────────────────────────────────────────────

#[test]
fn add_to_set_skips_existing_values() {
    let mut doc = account("acct-1");
    let update = doc! { "$addToSet": { "tags": { "$each": ["enterprise", "vip"] } } };
    assert!(update_document(&mut doc, &update).unwrap());
    assert_eq!(doc.get("tags"), Some(&bson!(["enterprise", "renewal_due", "vip"])));

    assert!(!update_document(&mut doc, &doc! { "$addToSet": { "tags": "vip" } }).unwrap());
}

#[test]
fn push_creates_missing_arrays() {
    let mut doc = account("acct-3");
    let contact = doc! { "name": "Flo", "role": "owner" };
    assert!(update_document(&mut doc, &doc! { "$push": { "contacts": contact.clone() } }).unwrap());
    assert_eq!(doc.get_array("contacts").unwrap(), &vec![Bson::Document(contact)]);
    assert!(filter_document(&doc, &doc! { "contacts.role": "owner" }).unwrap());
}

#[test]
fn pull_by_query_and_by_operator() {
    let mut doc = account("acct-5");
    assert!(update_document(&mut doc, &doc! { "$pull": { "contacts": { "role": "billing" } } }).unwrap());
    assert_eq!(doc.get("contacts"), Some(&bson!([ { "name": "Ed", "role": "owner" } ])));

    let mut doc = account("acct-4");
    assert!(update_document(&mut doc, &doc! { "$pull": { "tags": { "$in": ["enterprise"] } } }).unwrap());
    assert_eq!(doc.get("tags"), Some(&bson!(["high_value"])));
}

#[test]
fn pop_and_pull_all() {
    let mut doc = account("acct-4");
    assert!(update_document(&mut doc, &doc! { "$pop": { "tags": -1 } }).unwrap());
    assert_eq!(doc.get("tags"), Some(&bson!(["high_value"])));

    assert!(update_document(&mut doc, &doc! { "$pullAll": { "tags": ["high_value", "other"] } }).unwrap());
    assert_eq!(doc.get("tags"), Some(&bson!([])));
}

// ── Replacement and upsert ──────────────────────────────────────

#[test]
fn replacement_keeps_id() {
    let mut doc = account("acct-2");
    assert!(update_document(&mut doc, &doc! { "name": "Globex Corp", "status": "archived" }).unwrap());
    assert_eq!(doc, doc! { "_id": "acct-2", "name": "Globex Corp", "status": "archived" });

    let err = update_document(&mut doc, &doc! { "_id": "acct-9", "name": "x" }).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ImmutableField);
}

#[test]
fn upsert_applies_set_on_insert() {
    let mut doc = doc! { "_id": "acct-6" };
    let update = doc! {
        "$set": { "name": "Vandelay" },
        "$setOnInsert": { "status": "trial", "tags": [] },
    };
    assert!(update_document_with(&mut doc, &update, UpdateMode::Insert, &QueryConfig::default()).unwrap());
    assert_eq!(doc, doc! { "_id": "acct-6", "name": "Vandelay", "status": "trial" });

    let mut existing = account("acct-1");
    update_document(&mut existing, &update).unwrap();
    assert_eq!(existing.get_str("status").unwrap(), "active");
}

// ── Errors ──────────────────────────────────────────────────────

#[test]
fn type_errors_name_the_document() {
    let mut doc = account("acct-1");

    let err = update_document(&mut doc, &doc! { "$inc": { "name": 1 } }).unwrap_err();
    assert_eq!(err.code(), ErrorCode::TypeMismatch);
    assert_eq!(
        err.message(),
        "Cannot apply $inc to a value of non-numeric type. {_id: \"acct-1\"} has the field 'name' of non-numeric type string"
    );

    let err = update_document(&mut doc, &doc! { "$push": { "name": "x" } }).unwrap_err();
    assert_eq!(err.code(), ErrorCode::BadValue);
    assert_eq!(
        err.message(),
        "The field 'name' must be an array but is of type 'string' in document {_id: \"acct-1\"}"
    );
}

#[test]
fn invalid_updates_leave_the_document_alone() {
    let mut doc = account("acct-1");
    let before = doc.clone();

    let err = update_document(&mut doc, &doc! { "$set": { "score": 1 }, "$inc": { "score": 1 } }).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConflictingUpdateOperators);

    let err = update_document(&mut doc, &doc! { "$set": { "score": 1 }, "name": "x" }).unwrap_err();
    assert_eq!(err.code(), ErrorCode::DollarPrefixedFieldName);

    let err = update_document(&mut doc, &doc! { "$set": { "address..zip": 1 } }).unwrap_err();
    assert_eq!(err.code(), ErrorCode::EmptyName);

    assert_eq!(doc, before);
}
