use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use serde::{Deserialize, Serialize};
use shale_query::{
    CommandError, ErrorCode, QueryConfig, UpdateKind, UpdateMode, WriteErrors, filter_document_with,
    update_document_with, validate_update,
};
use tracing::{debug, warn};

use crate::options::UpdateOptions;

/// One statement of an `update` command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateStatement {
    #[serde(rename = "q")]
    pub filter: Document,
    #[serde(rename = "u")]
    pub update: Document,
    pub multi: bool,
}

/// Result of [`update_many`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
    /// Statement index and `_id` of each inserted document.
    pub upserted: Vec<(usize, Bson)>,
    pub write_errors: WriteErrors,
}

impl UpdateOutcome {
    /// `{ok: 1, n, nModified, upserted?, writeErrors?}`
    pub fn to_document(&self) -> Document {
        let n = self.matched + self.upserted.len() as u64;
        let mut reply = doc! {
            "ok": 1.0,
            "n": n as i64,
            "nModified": self.modified as i64,
        };
        if !self.upserted.is_empty() {
            let upserted: Vec<Bson> = self
                .upserted
                .iter()
                .map(|(index, id)| Bson::Document(doc! { "index": *index as i32, "_id": id.clone() }))
                .collect();
            reply.insert("upserted", upserted);
        }
        if !self.write_errors.is_empty() {
            let errors: Vec<Bson> = self
                .write_errors
                .iter()
                .map(|e| Bson::Document(e.to_document()))
                .collect();
            reply.insert("writeErrors", errors);
        }
        reply
    }
}

/// Apply `statements` to the in-memory collection `docs`.
///
/// Failures are recorded per statement with its index. An ordered batch
/// stops at the first failure; an unordered one carries on. A document is
/// only replaced once its whole update succeeded.
pub fn update_many(
    docs: &mut Vec<Document>,
    statements: &[UpdateStatement],
    options: &UpdateOptions,
    config: &QueryConfig,
) -> UpdateOutcome {
    let mut outcome = UpdateOutcome::default();

    for (index, statement) in statements.iter().enumerate() {
        if let Err(err) = apply_statement(docs, index, statement, options, config, &mut outcome) {
            warn!(index, code = err.code().code(), error = %err, "write error");
            outcome.write_errors.push(index, err);
            if options.ordered {
                break;
            }
        }
    }

    debug!(
        statements = statements.len(),
        matched = outcome.matched,
        modified = outcome.modified,
        errors = outcome.write_errors.len(),
        "update applied"
    );
    outcome
}

fn apply_statement(
    docs: &mut Vec<Document>,
    index: usize,
    statement: &UpdateStatement,
    options: &UpdateOptions,
    config: &QueryConfig,
    outcome: &mut UpdateOutcome,
) -> Result<(), CommandError> {
    let kind = validate_update(&statement.update)?;
    if statement.multi && kind == UpdateKind::Replacement {
        return Err(CommandError::new(
            ErrorCode::FailedToParse,
            "multi update is not supported for replacement-style update",
        ));
    }

    let mut matched = false;
    for doc in docs.iter_mut() {
        if !filter_document_with(doc, &statement.filter, config)? {
            continue;
        }
        matched = true;

        let mut updated = doc.clone();
        let changed = update_document_with(&mut updated, &statement.update, UpdateMode::Update, config)?;
        outcome.matched += 1;
        if changed {
            *doc = updated;
            outcome.modified += 1;
        }
        if !statement.multi {
            break;
        }
    }

    if !matched && options.upsert {
        let id = upsert(docs, statement, config)?;
        outcome.upserted.push((index, id));
    }
    Ok(())
}

/// Insert a document built from the filter's equality fields plus the
/// update, applied in insert mode so `$setOnInsert` takes effect.
fn upsert(docs: &mut Vec<Document>, statement: &UpdateStatement, config: &QueryConfig) -> Result<Bson, CommandError> {
    let mut doc = Document::new();
    let seed = equality_fields(&statement.filter);
    if !seed.is_empty() {
        update_document_with(&mut doc, &doc! { "$set": seed }, UpdateMode::Insert, config)?;
    }
    update_document_with(&mut doc, &statement.update, UpdateMode::Insert, config)?;

    let id = match doc.get("_id") {
        Some(id) => id.clone(),
        None => {
            let id = Bson::ObjectId(ObjectId::new());
            let mut with_id = doc! { "_id": id.clone() };
            for (key, value) in doc {
                with_id.insert(key, value);
            }
            doc = with_id;
            id
        }
    };
    docs.push(doc);
    Ok(id)
}

/// `{field: value}` clauses of a filter, skipping operators.
fn equality_fields(filter: &Document) -> Document {
    filter
        .iter()
        .filter(|(key, value)| {
            !key.starts_with('$')
                && match value {
                    Bson::Document(d) => !d.keys().next().is_some_and(|k| k.starts_with('$')),
                    Bson::RegularExpression(_) => false,
                    _ => true,
                }
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
