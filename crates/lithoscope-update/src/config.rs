//! Default field update strategy table.

use crate::field::FieldUpdate;
use crate::fields::base::{
    ListOfDictAppendUniqueUpdate, OverwriteFieldUpdate, PreferCurrentMergeDictUpdate,
};
use crate::fields::creatibutors::CreatibutorsFieldUpdate;
use crate::fields::custom_fields::ThesisFieldUpdate;
use crate::fields::identifiers::{IdentifiersFieldUpdate, RelatedIdentifiersUpdate};
use crate::fields::metadata::PublicationDateUpdate;

/// One strategy per updatable field path, in application order. Fields not
/// listed here are left untouched by the engine.
pub fn default_strategy_table() -> Vec<(String, Box<dyn FieldUpdate>)> {
    let entry = |path: &str, s: Box<dyn FieldUpdate>| (path.to_string(), s);
    vec![
        entry(
            "pids",
            Box::new(PreferCurrentMergeDictUpdate { keep_incoming_keys: vec![] }),
        ),
        entry("metadata.resource_type", Box::new(OverwriteFieldUpdate)),
        entry(
            "metadata.creators",
            Box::new(CreatibutorsFieldUpdate { strict: true }),
        ),
        entry(
            "metadata.contributors",
            Box::new(CreatibutorsFieldUpdate { strict: false }),
        ),
        entry("metadata.identifiers", Box::new(IdentifiersFieldUpdate)),
        entry(
            "metadata.related_identifiers",
            Box::new(RelatedIdentifiersUpdate),
        ),
        entry(
            "metadata.publication_date",
            Box::new(PublicationDateUpdate::default()),
        ),
        entry(
            "metadata.subjects",
            Box::new(ListOfDictAppendUniqueUpdate::new("subject")),
        ),
        entry(
            "metadata.languages",
            Box::new(ListOfDictAppendUniqueUpdate::new("id")),
        ),
        entry("metadata.description", Box::new(OverwriteFieldUpdate)),
        entry("metadata.title", Box::new(OverwriteFieldUpdate)),
        entry(
            "custom_fields.thesis:thesis",
            Box::new(ThesisFieldUpdate::default()),
        ),
        entry(
            "custom_fields.cern:accelerators",
            Box::new(ListOfDictAppendUniqueUpdate::new("id")),
        ),
        entry(
            "custom_fields.cern:experiments",
            Box::new(ListOfDictAppendUniqueUpdate::new("id")),
        ),
    ]
}
