use serde::Serialize;
use serde_with::skip_serializing_none;
use typed_builder::TypedBuilder;

use crate::{
    bson::{doc, Bson, Document},
    error::{Error, Result},
    operation::{append_options, Aspect, Command, Operation},
};

/// Specifies the options to a collection validation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, TypedBuilder, Serialize)]
#[serde(rename_all = "camelCase")]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct ValidateCollectionOptions {
    /// Perform a more thorough scan of the collection's data.
    pub full: Option<bool>,

    /// Validate in the background, without holding collection locks.
    pub background: Option<bool>,
}

/// Issues `{validate: <name>}` and runs an ordered acceptance check on the response. An `ok: 0`
/// response is already converted to a command error by the uniform response check; the remaining
/// domain-specific checks happen in `handle_response`, each short-circuiting the rest.
#[derive(Debug)]
pub(crate) struct ValidateCollection {
    db: String,
    coll: String,
    options: Option<ValidateCollectionOptions>,
}

impl ValidateCollection {
    pub(crate) fn new(
        db: impl Into<String>,
        coll: impl Into<String>,
        options: Option<ValidateCollectionOptions>,
    ) -> Self {
        Self {
            db: db.into(),
            coll: coll.into(),
            options,
        }
    }
}

impl Operation for ValidateCollection {
    type O = Document;

    const NAME: &'static str = "validate";

    const ASPECTS: Aspect = Aspect::EXECUTE_WITH_SELECTION;

    fn build(&self) -> Result<Command> {
        let mut body = doc! { Self::NAME: self.coll.clone() };
        append_options(&mut body, self.options.as_ref())?;
        Ok(Command::new(Self::NAME, self.db.clone(), body))
    }

    fn handle_response(&self, response: Document) -> Result<Self::O> {
        match response.get("result") {
            None => {}
            Some(Bson::String(result)) => {
                if result.contains("exception") || result.contains("corrupt") {
                    return Err(Error::invalid_response(format!(
                        "invalid collection {}: {}",
                        self.coll, result
                    )));
                }
            }
            Some(_) => {
                return Err(Error::invalid_response(format!(
                    "invalid validation data for collection {}",
                    self.coll
                )));
            }
        }

        if response.get("valid") == Some(&Bson::Boolean(false)) {
            return Err(Error::invalid_response(format!(
                "invalid collection {}: {}",
                self.coll, response
            )));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn op() -> ValidateCollection {
        ValidateCollection::new("test_db", "test_coll", None)
    }

    #[test]
    fn builds_validate_command_with_options() {
        let op = ValidateCollection::new(
            "test_db",
            "test_coll",
            Some(ValidateCollectionOptions::builder().full(true).build()),
        );
        let cmd = op.build().unwrap();
        assert_eq!(cmd.target_db, "test_db");
        assert_eq!(cmd.body, doc! { "validate": "test_coll", "full": true });
    }

    #[test]
    fn valid_response_is_returned_unchanged() {
        let response = doc! { "ok": 1, "valid": true, "nrecords": 10 };
        assert_eq!(op().handle_response(response.clone()).unwrap(), response);
    }

    #[test]
    fn non_string_result_field_fails() {
        let err = op()
            .handle_response(doc! { "ok": 1, "result": 42, "valid": true })
            .unwrap_err();
        assert!(err.to_string().contains("invalid validation data"));
    }

    #[test]
    fn exception_text_in_result_fails() {
        let err = op()
            .handle_response(doc! { "ok": 1, "result": "exception caught", "valid": true })
            .unwrap_err();
        assert!(err.to_string().contains("invalid collection"));

        assert!(op()
            .handle_response(doc! { "ok": 1, "result": "corrupt extent", "valid": true })
            .is_err());
    }

    #[test]
    fn explicit_invalid_flag_fails_even_when_ok() {
        let err = op()
            .handle_response(doc! { "ok": 1, "valid": false })
            .unwrap_err();
        assert!(err.to_string().contains("invalid collection"));
    }

    #[test]
    fn benign_result_string_passes() {
        assert!(op()
            .handle_response(doc! { "ok": 1, "result": "validation passed", "valid": true })
            .is_ok());
    }
}
