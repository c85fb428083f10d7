use crate::{
    bson::{Bson, Document},
    error::{ErrorKind, Result},
};

/// Coerce numeric types into an `i64` if it would be lossless to do so. If this [`Bson`] is not
/// numeric or the conversion would be lossy (e.g. 1.5 -> 1), this returns `None`.
pub(crate) fn get_int(val: &Bson) -> Option<i64> {
    match *val {
        Bson::Int32(i) => Some(i64::from(i)),
        Bson::Int64(i) => Some(i),
        Bson::Double(f) if (f - (f as i64 as f64)).abs() <= f64::EPSILON => Some(f as i64),
        _ => None,
    }
}

pub(crate) fn first_key(document: &Document) -> Option<&str> {
    document.keys().next().map(String::as_str)
}

/// Validates that a document only contains atomic update operators (i.e. all of its keys start
/// with `$`).
pub(crate) fn update_document_check(update: &Document) -> Result<()> {
    match first_key(update) {
        Some(key) if key.starts_with('$') => Ok(()),
        _ => Err(ErrorKind::InvalidArgument {
            message: "update document must only contain update modifiers".to_string(),
        }
        .into()),
    }
}

/// Validates that a replacement document contains no atomic update operators (i.e. none of its
/// keys start with `$`).
pub(crate) fn replacement_document_check(replacement: &Document) -> Result<()> {
    match first_key(replacement) {
        Some(key) if !key.starts_with('$') => Ok(()),
        None => Ok(()),
        _ => Err(ErrorKind::InvalidArgument {
            message: "replacement document must not contain update modifiers".to_string(),
        }
        .into()),
    }
}
