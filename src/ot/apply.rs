//! Committing transformed operations to a document

use chrono::Utc;

use super::document::Document;
use super::error::OperationError;
use super::operation::{CommittedOp, Edit, Operation};

/// Byte offset of the `at`-th character of `s`
fn byte_offset(s: &str, at: usize) -> usize {
    s.char_indices().nth(at).map(|(i, _)| i).unwrap_or(s.len())
}

/// Characters `start..end` of `s`
fn char_slice(s: &str, start: usize, end: usize) -> String {
    s[byte_offset(s, start)..byte_offset(s, end)].to_string()
}

fn span_text(span: &Operation) -> &str {
    match &span.edit {
        Edit::Insert { text } => text,
        Edit::Delete { .. } => "",
    }
}

/// Apply an operation directly to a plain string.
pub fn apply_to_text(text: &mut String, op: &Operation) -> Result<(), OperationError> {
    op.validate(text.chars().count())?;
    let start = byte_offset(text, op.index);
    match &op.edit {
        Edit::Insert { text: inserted } => text.insert_str(start, inserted),
        Edit::Delete { .. } => {
            let end = byte_offset(text, op.end());
            text.replace_range(start..end, "");
        }
    }
    Ok(())
}

/// Commit an operation, already transformed into current document
/// coordinates, and advance the version.
///
/// Out-of-range operations are rejected without touching the document.
pub fn commit(doc: &mut Document, op: Operation) -> Result<CommittedOp, OperationError> {
    op.validate(doc.len())?;

    match &op.edit {
        Edit::Insert { .. } => insert_span(doc, &op),
        Edit::Delete { length } => delete_range(doc, op.index, *length),
    }

    doc.version += 1;
    doc.authors.observe(&op.author_id, op.id);
    doc.updated_at = Utc::now();

    let committed = CommittedOp {
        version: doc.version,
        op,
    };
    doc.history.push(committed.clone());
    Ok(committed)
}

fn insert_span(doc: &mut Document, op: &Operation) {
    let at = op.index;
    let inserted = op.len();

    // a span straddling the insertion point is cut in two
    let straddling = doc
        .ops
        .iter()
        .position(|span| span.index < at && at < span.index + span.len());

    let pos = match straddling {
        Some(k) => {
            let span = &doc.ops[k];
            let cut = at - span.index;
            let text = span_text(span);
            let (left, right) = (char_slice(text, 0, cut), char_slice(text, cut, span.len()));
            let right = Operation {
                index: at,
                edit: Edit::Insert { text: right },
                ..span.clone()
            };
            doc.ops[k].edit = Edit::Insert { text: left };
            doc.ops.insert(k + 1, right);
            k + 1
        }
        None => doc
            .ops
            .iter()
            .position(|span| span.index >= at)
            .unwrap_or(doc.ops.len()),
    };

    doc.ops.insert(pos, op.clone());
    for span in &mut doc.ops[pos + 1..] {
        span.index += inserted;
    }
}

fn delete_range(doc: &mut Document, start: usize, length: usize) {
    let end = start + length;
    let spans = std::mem::take(&mut doc.ops);
    let mut kept = Vec::with_capacity(spans.len() + 1);

    for span in spans {
        let span_start = span.index;
        let span_end = span_start + span.len();

        if span_end <= start {
            kept.push(span);
        } else if span_start >= end {
            kept.push(span.at(span_start - length));
        } else {
            let text = span_text(&span).to_string();
            if span_start < start {
                kept.push(Operation {
                    edit: Edit::Insert {
                        text: char_slice(&text, 0, start - span_start),
                    },
                    ..span.clone()
                });
            }
            if span_end > end {
                kept.push(Operation {
                    index: start,
                    edit: Edit::Insert {
                        text: char_slice(&text, end - span_start, span_end - span_start),
                    },
                    ..span
                });
            }
        }
    }

    doc.ops = kept;
}
