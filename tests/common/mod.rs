use prisoner::domain::decision::Choice;
use rand::Rng;
use std::fs::File;
use std::io::Error;
use std::path::Path;

/// One script line: participant, round, decision (`None` = never answers).
pub type Row = (u32, u32, Option<Choice>);

pub fn write_script(path: &Path, rows: &[Row]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(["participant", "round", "decision", "response_ms"])?;

    for (participant, round, decision) in rows {
        let decision = match decision {
            Some(Choice::Cooperate) => "cooperate",
            Some(Choice::Defect) => "defect",
            None => "",
        };
        wtr.write_record([
            participant.to_string().as_str(),
            round.to_string().as_str(),
            decision,
            "",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Random choices for `participants` over two rounds; round-2 answers are
/// sometimes withheld so the timeout default kicks in.
pub fn random_rows<R: Rng>(rng: &mut R, participants: u32) -> Vec<Row> {
    let mut rows = Vec::new();
    for round in 1..=2 {
        for participant in 1..=participants {
            let decision = if round == 2 && rng.gen_bool(0.2) {
                None
            } else {
                Some(Choice::from_cooperate(rng.gen_bool(0.5)))
            };
            rows.push((participant, round, decision));
        }
    }
    rows
}
