#![allow(dead_code)]

use bson::{Bson, DateTime, Document, doc};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

// ── Constants ───────────────────────────────────────────────

pub const STATUSES: &[&str] = &["active", "rejected", "trial"];
pub const CITIES: &[&str] = &["Austin", "Denver", "Palo Alto", "Boston"];
pub const ROLES: &[&str] = &["owner", "billing", "support"];
pub const TAGS: &[&str] = &[
    "renewal_due",
    "high_value",
    "churning",
    "new_customer",
    "enterprise",
];

// ── Helpers ─────────────────────────────────────────────────

pub fn generate_doc(rng: &mut StdRng, seq: usize) -> Document {
    let mut doc = doc! {
        "_id": format!("acct-{seq}"),
        "name": format!("Company-{seq}"),
        "status": STATUSES[rng.gen_range(0..STATUSES.len())],
        "score": rng.gen_range(0_i32..100),
        "address": { "city": CITIES[rng.gen_range(0..CITIES.len())] },
    };

    let tag_count = rng.gen_range(0..=4);
    let tags: Vec<&str> = (0..tag_count)
        .map(|_| TAGS[rng.gen_range(0..TAGS.len())])
        .collect();
    doc.insert("tags", tags);

    let contacts: Vec<Bson> = (0..rng.gen_range(0..4))
        .map(|i| {
            Bson::Document(doc! {
                "name": format!("Contact {seq}-{i}"),
                "role": ROLES[rng.gen_range(0..ROLES.len())],
            })
        })
        .collect();
    doc.insert("contacts", contacts);

    if rng.gen_ratio(7, 10) {
        let epoch_secs = rng.gen_range(1_700_000_000_i64..1_740_000_000);
        doc.insert("last_contacted_at", DateTime::from_millis(epoch_secs * 1000));
    }

    doc
}

/// `n` documents from a fixed seed, so runs are comparable.
pub fn generate_docs(n: usize) -> Vec<Document> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n).map(|i| generate_doc(&mut rng, i)).collect()
}
