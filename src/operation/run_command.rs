use crate::{
    bson::Document,
    bson_util,
    error::{Error, Result},
    operation::{Aspect, Command, Operation},
    selection_criteria::SelectionCriteria,
};

/// A generic command operation: runs an arbitrary command document against a database and hands
/// the raw response back. The admin facade and `Database::run_command` are built on this.
#[derive(Debug)]
pub(crate) struct RunCommand {
    db: String,
    command: Document,
    selection_criteria: Option<SelectionCriteria>,
}

impl RunCommand {
    pub(crate) fn new(
        db: impl Into<String>,
        command: Document,
        selection_criteria: Option<SelectionCriteria>,
    ) -> Result<Self> {
        if bson_util::first_key(&command).is_none() {
            return Err(Error::invalid_argument(
                "an empty document cannot be run as a command",
            ));
        }
        Ok(Self {
            db: db.into(),
            command,
            selection_criteria,
        })
    }
}

impl Operation for RunCommand {
    type O = Document;

    const NAME: &'static str = "runCommand";

    const ASPECTS: Aspect = Aspect::EXECUTE_WITH_SELECTION;

    fn build(&self) -> Result<Command> {
        let name = bson_util::first_key(&self.command)
            .map(String::from)
            .unwrap_or_default();
        Ok(Command::new(name, self.db.clone(), self.command.clone()))
    }

    fn handle_response(&self, response: Document) -> Result<Self::O> {
        Ok(response)
    }

    fn selection_criteria(&self) -> Option<&SelectionCriteria> {
        self.selection_criteria.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bson::doc;

    #[test]
    fn empty_command_is_rejected() {
        assert!(RunCommand::new("admin", doc! {}, None).is_err());
    }

    #[test]
    fn command_name_is_first_key() {
        let op = RunCommand::new("admin", doc! { "ping": 1 }, None).unwrap();
        let cmd = op.build().unwrap();
        assert_eq!(cmd.name, "ping");
        assert_eq!(cmd.target_db, "admin");
    }
}
