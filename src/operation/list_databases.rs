use serde::Deserialize;

use crate::{
    bson::{doc, Document},
    error::{Error, Result},
    operation::{append_options, Aspect, Command, Operation},
    results::DatabaseSpecification,
};

use serde_with::skip_serializing_none;
use typed_builder::TypedBuilder;

/// Specifies the options to a `listDatabases` operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, TypedBuilder, serde::Serialize)]
#[serde(rename_all = "camelCase")]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct ListDatabasesOptions {
    /// A filter on the databases to list.
    pub filter: Option<Document>,

    /// Only list databases the authorized user has access to.
    pub authorized_databases: Option<bool>,
}

#[derive(Debug)]
pub(crate) struct ListDatabases {
    name_only: bool,
    options: Option<ListDatabasesOptions>,
}

impl ListDatabases {
    pub(crate) fn new(name_only: bool, options: Option<ListDatabasesOptions>) -> Self {
        Self { name_only, options }
    }
}

impl Operation for ListDatabases {
    type O = Vec<DatabaseSpecification>;

    const NAME: &'static str = "listDatabases";

    const ASPECTS: Aspect = Aspect::EXECUTE_WITH_SELECTION;

    fn build(&self) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: 1,
            "nameOnly": self.name_only,
        };
        append_options(&mut body, self.options.as_ref())?;
        Ok(Command::new(Self::NAME, "admin", body))
    }

    fn handle_response(&self, response: Document) -> Result<Self::O> {
        #[derive(Deserialize)]
        struct ResponseBody {
            databases: Vec<DatabaseSpecification>,
        }

        let body: ResponseBody = bson::from_bson(bson::Bson::Document(response))
            .map_err(|e| Error::invalid_response(format!("malformed listDatabases reply: {}", e)))?;
        Ok(body.databases)
    }
}
