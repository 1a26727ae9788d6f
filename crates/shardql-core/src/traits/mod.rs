use crate::model::entity::EntityModel;

///
/// EntityKind
///
/// Sharded entity bound to its static routing model.
///
/// Implemented by the application for every record type it routes; the
/// session only ever reads `MODEL`.
///

pub trait EntityKind {
    const MODEL: &'static EntityModel;
}
