use crate::application::session::RoundSummary;
use crate::error::Result;
use std::io::Write;

/// Writes per-round results as CSV:
/// `participant,round,group,decision,opponent_decision,same_choice,timed_out,payoff,total`.
pub struct ResultsWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ResultsWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_summaries<I>(&mut self, summaries: I) -> Result<()>
    where
        I: IntoIterator<Item = RoundSummary>,
    {
        for summary in summaries {
            self.writer.serialize(summary)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
