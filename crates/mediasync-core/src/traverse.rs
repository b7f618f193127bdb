//! Recursive discovery of image descriptors in content records.
//!
//! Every visited value is classified into a [`Visit`]: an object with a
//! `mime` key is an image descriptor and is never descended into; arrays and
//! other objects are walked depth-first; everything else is a leaf.

use futures::{StreamExt, TryStreamExt, stream};
use serde_json::{Map, Value};
use tracing::debug;

use crate::context::MediaContext;
use crate::resolver::resolve_and_attach;
use crate::sync::SyncReport;
use crate::types::MIME_FIELD;
use crate::Result;

/// Classification of a visited value.
#[derive(Debug)]
pub enum Visit<'a> {
    /// Object carrying a `mime` key.
    Image(&'a mut Map<String, Value>),
    /// Ordered sequence.
    Sequence(&'a mut Vec<Value>),
    /// Any other object.
    Mapping(&'a mut Map<String, Value>),
    /// Strings, numbers, booleans and `null`.
    Scalar,
}

/// Classify a value for traversal.
pub fn classify(value: &mut Value) -> Visit<'_> {
    match value {
        Value::Object(map) => {
            if map.contains_key(MIME_FIELD) {
                Visit::Image(map)
            } else {
                Visit::Mapping(map)
            }
        },
        Value::Array(items) => Visit::Sequence(items),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Visit::Scalar,
    }
}

/// Collect every image descriptor reachable from `value`, depth-first.
///
/// Each descriptor appears once; descriptors nested inside other descriptors
/// are not collected.
pub fn collect_images(value: &mut Value) -> Vec<&mut Map<String, Value>> {
    let mut found = Vec::new();
    collect_into(value, &mut found);
    found
}

fn collect_into<'a>(value: &'a mut Value, found: &mut Vec<&'a mut Map<String, Value>>) {
    match classify(value) {
        Visit::Image(descriptor) => found.push(descriptor),
        Visit::Sequence(items) => {
            for item in items {
                collect_into(item, found);
            }
        },
        Visit::Mapping(fields) => {
            for field in fields.values_mut() {
                collect_into(field, found);
            }
        },
        Visit::Scalar => {},
    }
}

/// Resolve every image descriptor in one record, attaching handles in place.
///
/// Images are resolved `images_per_record` at a time in depth-first order; the
/// first failure stops the record.
pub async fn extract_fields(record: &mut Value, ctx: &MediaContext) -> Result<SyncReport> {
    let images = collect_images(record);
    debug!(images = images.len(), "traversing record");

    let resolved: Vec<_> = stream::iter(images)
        .map(|descriptor| resolve_and_attach(descriptor, ctx))
        .buffered(ctx.concurrency().images_per_record)
        .try_collect()
        .await?;

    let mut report = SyncReport {
        records: 1,
        ..SyncReport::default()
    };
    for image in resolved {
        report.record_image(image);
    }
    Ok(report)
}
