//! The human side of a draw: picking a group and year, and entering clusters.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use thiserror::Error;

use crate::participant::{parse_year, Cluster, Group, GroupId, InvalidInput, Roster, Year};

/// Typed at the cluster prompt to stop entering clusters.
pub const CLUSTERS_DONE: &str = "done";

/// The operator could not be asked.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Input ended before a valid answer was given.
    #[error("operator closed the input")]
    Closed,
    /// Reading or writing the channel failed.
    #[error("operator channel failed: {0}")]
    Io(#[from] io::Error),
}

/// Answers the questions a draw needs.
///
/// Invalid answers are the implementation's business to reject and ask again; a returned error ends the draw.
pub trait Operator {
    /// Pick one of `groups`, which is never empty.
    fn choose_group(&mut self, groups: &[Group]) -> Result<Group, OperatorError>;
    /// Pick the year to draw for `group`, strictly after `latest` if one is given.
    fn choose_year(&mut self, group: &Group, latest: Option<Year>) -> Result<Year, OperatorError>;
    /// Zero or more clusters over `roster`.
    fn collect_clusters(&mut self, roster: &Roster) -> Result<Vec<Cluster>, OperatorError>;
}

impl<O: Operator + ?Sized> Operator for &mut O {
    fn choose_group(&mut self, groups: &[Group]) -> Result<Group, OperatorError> {
        (**self).choose_group(groups)
    }

    fn choose_year(&mut self, group: &Group, latest: Option<Year>) -> Result<Year, OperatorError> {
        (**self).choose_year(group, latest)
    }

    fn collect_clusters(&mut self, roster: &Roster) -> Result<Vec<Cluster>, OperatorError> {
        (**self).collect_clusters(roster)
    }
}

/// Line based prompts over any reader and writer, usually stdin and stdout.
pub struct TerminalOperator<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalOperator<R, W> {
    /// Prompt on `output` and read answers from `input`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Give back the reader and writer.
    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    /// Ask where the database lives. Blank answers are asked again.
    pub fn ask_database_path(&mut self) -> Result<PathBuf, OperatorError> {
        loop {
            let answer = self.ask("What is the path to the database? ")?;
            if !answer.is_empty() {
                return Ok(PathBuf::from(answer));
            }
        }
    }

    /// Write `message` on its own line.
    pub fn say(&mut self, message: impl std::fmt::Display) -> Result<(), OperatorError> {
        writeln!(self.output, "{message}")?;
        Ok(())
    }

    fn ask(&mut self, prompt: &str) -> Result<String, OperatorError> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(OperatorError::Closed);
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Operator for TerminalOperator<R, W> {
    fn choose_group(&mut self, groups: &[Group]) -> Result<Group, OperatorError> {
        self.say("Select one of the following groups to draw:")?;
        for group in groups {
            self.say(format_args!("{}: {}", group.id, group.name))?;
        }

        loop {
            let answer = self.ask("Select a group by number: ")?;
            // names may look like ids, so only ids are accepted
            let chosen = answer.parse::<GroupId>().ok()
                .and_then(|id| groups.iter().find(|group| group.id == id));

            match chosen {
                Some(group) => return Ok(group.clone()),
                None => self.say(InvalidInput::UnknownGroup(answer))?,
            }
        }
    }

    fn choose_year(&mut self, group: &Group, latest: Option<Year>) -> Result<Year, OperatorError> {
        if let Some(latest) = latest {
            self.say(format_args!("{} was last drawn for {latest}.", group.name))?;
        }

        loop {
            let answer = self.ask("What year would you like to draw for? ")?;
            match parse_year(&answer, latest) {
                Ok(year) => return Ok(year),
                Err(err) => self.say(format_args!("This year is invalid: {err}"))?,
            }
        }
    }

    fn collect_clusters(&mut self, roster: &Roster) -> Result<Vec<Cluster>, OperatorError> {
        self.say("The following people are in this group:")?;
        for (index, participant) in roster.iter().enumerate() {
            self.say(format_args!("{index}: {participant}"))?;
        }
        self.say(format_args!("Enter space separated numbers to create a cluster, or {CLUSTERS_DONE} to move on."))?;

        let mut clusters = Vec::new();
        loop {
            let answer = self.ask("cluster> ")?;
            if answer == CLUSTERS_DONE {
                return Ok(clusters);
            }

            match Cluster::parse(&answer, roster.len()) {
                Ok(cluster) => clusters.push(cluster),
                Err(err) => self.say(format_args!("Please enter only valid numbers: {err}"))?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::participant::Participant;

    use super::*;

    fn operator(input: &str) -> TerminalOperator<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalOperator::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn transcript(operator: TerminalOperator<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(operator.into_inner().1).unwrap()
    }

    fn groups() -> Vec<Group> {
        vec![Group { id: 3, name: "family".to_string() }, Group { id: 7, name: "work".to_string() }]
    }

    fn roster() -> Roster {
        Roster::new(vec![Participant::new(1, "Ann"), Participant::new(2, "Ben"), Participant::new(3, "Cat")])
    }

    #[test]
    fn group_by_id() {
        let mut op = operator("7\n");
        assert_eq!(op.choose_group(&groups()).unwrap().name, "work");
    }

    #[test]
    fn group_names_are_not_ids() {
        let groups = vec![Group { id: 3, name: "7".to_string() }, Group { id: 7, name: "work".to_string() }];

        let mut op = operator("family\n7\n");
        assert_eq!(op.choose_group(&groups).unwrap().name, "work");
        assert!(transcript(op).contains("`family` is not one of the listed groups"));
    }

    #[test]
    fn unknown_group_is_asked_again() {
        let mut op = operator("5\n\n3\n");
        assert_eq!(op.choose_group(&groups()).unwrap().id, 3);

        let transcript = transcript(op);
        assert!(transcript.contains("3: family\n7: work\n"));
        assert_eq!(transcript.matches("Select a group by number: ").count(), 3);
        assert!(transcript.contains("`5` is not one of the listed groups"));
    }

    #[test]
    fn year_must_be_numeric_and_increasing() {
        let mut op = operator("next\n2023\n2022\n2024\n");
        assert_eq!(op.choose_year(&groups()[0], Some(2023)).unwrap(), 2024);
        assert_eq!(transcript(op).matches("This year is invalid").count(), 3);
    }

    #[test]
    fn any_year_without_history() {
        let mut op = operator(" 1999 \n");
        assert_eq!(op.choose_year(&groups()[0], None).unwrap(), 1999);
    }

    #[test]
    fn clusters_until_done() {
        let mut op = operator("0 1\n2\ndone\n");
        let clusters = op.collect_clusters(&roster()).unwrap();
        assert_eq!(clusters.iter().map(|c| c.members().to_vec()).collect::<Vec<_>>(), vec![vec![0, 1], vec![2]]);
        assert!(transcript(op).contains("0: Ann\n1: Ben\n2: Cat\n"));
    }

    #[test]
    fn bad_cluster_keeps_earlier_ones() {
        let mut op = operator("0 2\n1 9\nx\n\n1 2\ndone\n");
        let clusters = op.collect_clusters(&roster()).unwrap();

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[1].members(), &[1, 2]);
        assert_eq!(transcript(op).matches("Please enter only valid numbers").count(), 3);
    }

    #[test]
    fn no_clusters() {
        let mut op = operator("done\n");
        assert!(op.collect_clusters(&roster()).unwrap().is_empty());
    }

    #[test]
    fn end_of_input_is_closed() {
        let mut op = operator("0 1\n");
        assert!(matches!(op.collect_clusters(&roster()), Err(OperatorError::Closed)));

        let mut op = operator("abc\n");
        assert!(matches!(op.choose_year(&groups()[0], None), Err(OperatorError::Closed)));
    }

    #[test]
    fn database_path() {
        let mut op = operator("\n/tmp/santa.db\n");
        assert_eq!(op.ask_database_path().unwrap(), PathBuf::from("/tmp/santa.db"));
    }
}
