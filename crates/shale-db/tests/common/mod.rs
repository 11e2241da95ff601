#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use bson::{Document, doc};
use shale_db::{DbError, DocIter, DocumentIter, ValuesIter};

// ── Logging ─────────────────────────────────────────────────

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

// ── Fixtures ────────────────────────────────────────────────

pub fn accounts() -> Vec<Document> {
    vec![
        doc! {
            "_id": "acct-1",
            "name": "Acme",
            "status": "active",
            "score": 91,
            "tags": ["enterprise", "renewal_due"],
            "contacts": [ { "name": "Ann", "role": "owner" }, { "name": "Bo", "role": "billing" } ],
        },
        doc! {
            "_id": "acct-2",
            "name": "Globex",
            "status": "rejected",
            "score": 47.5,
            "tags": ["churning"],
            "contacts": [ { "name": "Cy", "role": "owner" } ],
        },
        doc! {
            "_id": "acct-3",
            "name": "Initech",
            "status": "active",
            "score": 72_i64,
            "tags": [],
        },
        doc! {
            "_id": "acct-4",
            "name": "Umbrella",
            "status": null,
            "tags": ["enterprise", "high_value"],
        },
        doc! {
            "_id": "acct-5",
            "name": "Hooli",
            "status": "active",
            "score": 72,
            "tags": ["new_customer"],
            "contacts": [ { "name": "Di", "role": "billing" }, { "name": "Ed", "role": "owner" } ],
        },
    ]
}

pub fn ids(docs: &[Document]) -> Vec<String> {
    docs.iter()
        .map(|d| d.get_str("_id").unwrap().to_string())
        .collect()
}

// ── Sources ─────────────────────────────────────────────────

/// Wraps a source and counts how often it is closed.
pub struct CountingClose {
    inner: ValuesIter,
    closes: Rc<Cell<usize>>,
}

impl DocumentIter for CountingClose {
    fn next(&mut self) -> Result<Option<Document>, DbError> {
        self.inner.next()
    }

    fn close(&mut self) {
        self.closes.set(self.closes.get() + 1);
        self.inner.close();
    }
}

/// The accounts as a source, plus its close counter.
pub fn source() -> (DocIter<'static>, Rc<Cell<usize>>) {
    let closes = Rc::new(Cell::new(0));
    let iter = CountingClose {
        inner: ValuesIter::new(accounts()),
        closes: Rc::clone(&closes),
    };
    (Box::new(iter), closes)
}
