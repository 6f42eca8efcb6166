use crate::application::script::DecisionScript;
use crate::domain::decision::{Choice, Response};
use crate::domain::player::ParticipantId;
use crate::error::{ExperimentError, Result};
use serde::Deserialize;
use std::io::Read;
use std::time::Duration;

/// One line of a decision script: `participant, round, decision, response_ms`.
///
/// An empty `decision` means the participant never submits the form.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ScriptRow {
    pub participant: u32,
    pub round: u32,
    pub decision: Option<Choice>,
    #[serde(default)]
    pub response_ms: Option<u64>,
}

impl ScriptRow {
    pub fn participant(&self) -> ParticipantId {
        ParticipantId(self.participant)
    }

    pub fn response(&self) -> Response {
        Response {
            choice: self.decision,
            after: Duration::from_millis(self.response_ms.unwrap_or(0)),
        }
    }
}

/// Reads decision scripts from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<ScriptRow>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct ScriptReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ScriptReader<R> {
    /// Creates a new `ScriptReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes script rows.
    pub fn rows(self) -> impl Iterator<Item = Result<ScriptRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(ExperimentError::from))
    }

    /// Collects every readable row into a script, handing unreadable rows to
    /// `on_error` and skipping them.
    pub fn into_script(self, mut on_error: impl FnMut(ExperimentError)) -> DecisionScript {
        let mut script = DecisionScript::new();
        for row in self.rows() {
            match row {
                Ok(row) => script.insert(row.participant(), row.round, row.response()),
                Err(e) => on_error(e),
            }
        }
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_valid_stream() {
        let data = "participant, round, decision, response_ms\n1, 1, cooperate, \n2, 1, defect, 250\n1, 2, , ";
        let reader = ScriptReader::new(data.as_bytes());
        let results: Vec<Result<ScriptRow>> = reader.rows().collect();

        assert_eq!(results.len(), 3);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.participant, 1);
        assert_eq!(first.decision, Some(Choice::Cooperate));
        assert_eq!(first.response(), Response::answer(Choice::Cooperate));

        let second = results[1].as_ref().unwrap();
        assert_eq!(second.response().after, Duration::from_millis(250));

        let silent = results[2].as_ref().unwrap();
        assert_eq!(silent.decision, None);
        assert_eq!(silent.response(), Response::silent());
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "participant, round, decision, response_ms\n1, 1, maybe, ";
        let reader = ScriptReader::new(data.as_bytes());
        let results: Vec<Result<ScriptRow>> = reader.rows().collect();

        assert!(results[0].is_err());
    }

    #[test]
    fn test_into_script_skips_bad_rows() {
        let data = "participant, round, decision, response_ms\n1, 1, cooperate, \nx, 1, defect, \n2, 1, defect, ";
        let mut errors = 0;
        let script = ScriptReader::new(data.as_bytes()).into_script(|_| errors += 1);

        assert_eq!(errors, 1);
        assert_eq!(script.participants(), vec![ParticipantId(1), ParticipantId(2)]);
        assert_eq!(
            script.responses_for(ParticipantId(2))[&1].choice,
            Some(Choice::Defect)
        );
    }
}
