#![allow(dead_code)]

use bson::{Document, doc};

// ── Fixtures ────────────────────────────────────────────────

/// Five account records with nested documents, arrays and mixed numeric
/// types.
pub fn accounts() -> Vec<Document> {
    vec![
        doc! {
            "_id": "acct-1",
            "name": "Acme",
            "status": "active",
            "score": 91,
            "tags": ["enterprise", "renewal_due"],
            "address": { "city": "Austin", "zip": "78701" },
            "contacts": [ { "name": "Ann", "role": "owner" }, { "name": "Bo", "role": "billing" } ],
        },
        doc! {
            "_id": "acct-2",
            "name": "Globex",
            "status": "rejected",
            "score": 47.5,
            "tags": ["churning"],
            "address": { "city": "Denver", "zip": "80202" },
            "contacts": [ { "name": "Cy", "role": "owner" } ],
        },
        doc! {
            "_id": "acct-3",
            "name": "Initech",
            "status": "active",
            "score": 72_i64,
            "tags": [],
            "address": { "city": "Austin" },
        },
        doc! {
            "_id": "acct-4",
            "name": "Umbrella",
            "status": null,
            "tags": ["enterprise", "high_value"],
            "contacts": [],
        },
        doc! {
            "_id": "acct-5",
            "name": "Hooli",
            "status": "active",
            "score": 72,
            "tags": ["new_customer"],
            "address": { "city": "Palo Alto", "zip": "94301" },
            "contacts": [ { "name": "Di", "role": "billing" }, { "name": "Ed", "role": "owner" } ],
        },
    ]
}

/// `_id`s of `docs` in order.
pub fn ids(docs: &[Document]) -> Vec<String> {
    docs.iter()
        .map(|d| d.get_str("_id").unwrap().to_string())
        .collect()
}

/// `_id`s of the accounts matching `filter`.
pub fn matching(filter: Document) -> Vec<String> {
    let docs: Vec<Document> = accounts()
        .into_iter()
        .filter(|d| shale_query::filter_document(d, &filter).unwrap())
        .collect();
    ids(&docs)
}
