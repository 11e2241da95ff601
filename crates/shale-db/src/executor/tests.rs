use std::cell::Cell;
use std::rc::Rc;

use bson::{Document, doc};
use shale_query::{ErrorCode, QueryConfig};

use super::*;

/// In-memory source that counts `close` calls and can fail after a
/// number of documents.
struct Tracked {
    docs: std::vec::IntoIter<Document>,
    fail_after: Option<usize>,
    pulled: usize,
    closes: Rc<Cell<usize>>,
}

fn tracked(docs: Vec<Document>) -> (DocIter<'static>, Rc<Cell<usize>>) {
    let closes = Rc::new(Cell::new(0));
    let iter = Tracked {
        docs: docs.into_iter(),
        fail_after: None,
        pulled: 0,
        closes: Rc::clone(&closes),
    };
    (Box::new(iter), closes)
}

fn failing(docs: Vec<Document>, after: usize) -> (DocIter<'static>, Rc<Cell<usize>>) {
    let closes = Rc::new(Cell::new(0));
    let iter = Tracked {
        docs: docs.into_iter(),
        fail_after: Some(after),
        pulled: 0,
        closes: Rc::clone(&closes),
    };
    (Box::new(iter), closes)
}

impl DocumentIter for Tracked {
    fn next(&mut self) -> Result<Option<Document>, DbError> {
        if self.fail_after == Some(self.pulled) {
            return Err(DbError::Source("boom".into()));
        }
        self.pulled += 1;
        Ok(self.docs.next())
    }

    fn close(&mut self) {
        self.closes.set(self.closes.get() + 1);
    }
}

fn docs() -> Vec<Document> {
    vec![
        doc! { "_id": 1, "n": 3, "tag": "a" },
        doc! { "_id": 2, "n": 1, "tag": ["b", "a"] },
        doc! { "_id": 3, "n": 2, "tag": "c" },
        doc! { "_id": 4, "tag": null },
    ]
}

fn ids(docs: &[Document]) -> Vec<i32> {
    docs.iter().map(|d| d.get_i32("_id").unwrap()).collect()
}

// ── Close discipline ────────────────────────────────────────────

#[test]
fn close_reaches_inner_exactly_once() {
    let (source, closes) = tracked(docs());
    let mut iter = FilterIter::new(source, doc! {}, QueryConfig::default());
    iter.close();
    iter.close();
    drop(iter);
    assert_eq!(closes.get(), 1);
}

#[test]
fn drop_closes_inner() {
    let (source, closes) = tracked(docs());
    let inner = SkipIter::new(source, 1);
    let iter = LimitIter::new(Box::new(inner), 1);
    drop(iter);
    assert_eq!(closes.get(), 1);
}

#[test]
fn next_after_close_is_an_error() {
    let (source, _) = tracked(docs());
    let mut iter = SkipIter::new(source, 0);
    iter.close();
    assert_eq!(iter.next(), Err(DbError::Closed));
}

#[test]
fn drain_closes_after_errors() {
    let (source, closes) = failing(docs(), 2);
    let iter = FilterIter::new(source, doc! {}, QueryConfig::default());
    assert_eq!(drain(iter), Err(DbError::Source("boom".into())));
    assert_eq!(closes.get(), 1);
}

#[test]
fn failed_construction_closes_inner() {
    let (source, closes) = tracked(docs());
    let err = SortIter::new(source, &doc! { "n": 2 }, &QueryConfig::default()).err().unwrap();
    assert!(matches!(err, DbError::Command(e) if e.code() == ErrorCode::SortBadOrder));
    assert_eq!(closes.get(), 1);

    let (source, closes) = tracked(docs());
    assert!(ProjectionIter::new(source, &doc! { "a": 1, "b": 0 }, doc! {}, QueryConfig::default()).is_err());
    assert_eq!(closes.get(), 1);
}

// ── Stages ──────────────────────────────────────────────────────

#[test]
fn values_yields_in_order() {
    let out = drain(ValuesIter::new(docs())).unwrap();
    assert_eq!(ids(&out), vec![1, 2, 3, 4]);
}

#[test]
fn filter_drops_non_matching() {
    let (source, _) = tracked(docs());
    let out = drain(FilterIter::new(source, doc! { "tag": "a" }, QueryConfig::default())).unwrap();
    assert_eq!(ids(&out), vec![1, 2]);
}

#[test]
fn filter_errors_surface() {
    let (source, closes) = tracked(docs());
    let iter = FilterIter::new(source, doc! { "n": { "$bogus": 1 } }, QueryConfig::default());
    let err = drain(iter).unwrap_err();
    assert!(matches!(err, DbError::Command(e) if e.code() == ErrorCode::BadValue));
    assert_eq!(closes.get(), 1);
}

#[test]
fn projection_applies_to_each_document() {
    let (source, _) = tracked(docs());
    let iter = ProjectionIter::new(source, &doc! { "n": 1, "_id": 0 }, doc! {}, QueryConfig::default()).unwrap();
    let out = drain(iter).unwrap();
    assert_eq!(out, vec![doc! { "n": 3 }, doc! { "n": 1 }, doc! { "n": 2 }, doc! {}]);
}

#[test]
fn sort_materializes_and_orders() {
    let (source, closes) = tracked(docs());
    let iter = SortIter::new(source, &doc! { "n": -1 }, &QueryConfig::default()).unwrap();
    let out = drain(iter).unwrap();
    assert_eq!(ids(&out), vec![1, 3, 2, 4]);
    assert_eq!(closes.get(), 1);
}

#[test]
fn count_yields_one_document() {
    let (source, _) = tracked(docs());
    let out = drain(CountIter::new(source, "n")).unwrap();
    assert_eq!(out, vec![doc! { "n": 4 }]);

    let out = drain(CountIter::new(Box::new(ValuesIter::new(Vec::new())), "count")).unwrap();
    assert_eq!(out, vec![doc! { "count": 0 }]);
}

#[test]
fn distinct_flattens_and_sorts() {
    let (source, _) = tracked(docs());
    let out = drain(DistinctIter::new(source, "tag").unwrap()).unwrap();
    assert_eq!(out, vec![doc! { "values": [null, "a", "b", "c"] }]);

    let (source, closes) = tracked(docs());
    let err = DistinctIter::new(source, "").err().unwrap();
    assert!(matches!(err, DbError::Command(e) if e.code() == ErrorCode::EmptyFieldPath));
    assert_eq!(closes.get(), 1);
}

#[test]
fn distinct_merges_equal_numbers_keeping_the_first() {
    let docs = vec![
        doc! { "_id": 1, "v": 2 },
        doc! { "_id": 2, "v": [1, 1.0, "a"] },
        doc! { "_id": 3, "v": 1_i64 },
        doc! { "_id": 4, "v": ["a", 2.0] },
        doc! { "_id": 5, "v": [] },
    ];
    let (source, closes) = tracked(docs);
    let out = drain(DistinctIter::new(source, "v").unwrap()).unwrap();
    assert_eq!(out, vec![doc! { "values": [1, 2, "a"] }]);
    assert_eq!(closes.get(), 1);
}

#[test]
fn skip_and_limit() {
    let (source, _) = tracked(docs());
    let out = drain(LimitIter::new(Box::new(SkipIter::new(source, 1)), 2)).unwrap();
    assert_eq!(ids(&out), vec![2, 3]);

    let (source, _) = tracked(docs());
    assert!(drain(SkipIter::new(source, 10)).unwrap().is_empty());
}

#[test]
fn limit_stops_pulling() {
    // the source would fail on its third pull
    let (source, _) = failing(docs(), 2);
    let out = drain(LimitIter::new(source, 2)).unwrap();
    assert_eq!(ids(&out), vec![1, 2]);
}
