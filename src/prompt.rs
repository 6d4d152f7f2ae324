use anyhow::{bail, Result};
use std::io::{BufRead, Write};
use std::str::FromStr;

use crate::criteria::{parse_count, CriteriaInput, Experience, JobType};

/// Asks on `input`/`output` for whatever criteria the command line left out.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        writeln!(self.output, "{}", question)?;
        self.output.flush()?; // Ensure prompt is shown before input
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("Input closed while waiting for: {}", question);
        }
        Ok(line.trim().to_string())
    }

    fn ask_until<T, F>(&mut self, question: &str, mut parse: F) -> Result<T>
    where
        F: FnMut(&str) -> std::result::Result<T, String>,
    {
        loop {
            let answer = self.ask(question)?;
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(message) => writeln!(self.output, "{}", message)?,
            }
        }
    }

    fn ask_parsed<T>(&mut self, question: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.ask_until(question, |answer| answer.parse::<T>().map_err(|e| e.to_string()))
    }

    /// Prompts, in order, for each field not already present in `given`.
    pub fn complete(&mut self, mut given: CriteriaInput, asked: &Asked) -> Result<CriteriaInput> {
        if given.title.trim().is_empty() {
            given.title = self.ask_until("Enter the desired job title (required):", |a| {
                if a.is_empty() {
                    Err("Job title required.".to_string())
                } else {
                    Ok(a.to_string())
                }
            })?;
        }

        while given.city.trim().is_empty() || given.state.trim().is_empty() {
            given.city = self.ask("Enter desired city (required):")?;
            given.state = self.ask("Enter desired state (required, ex: CO):")?;
            if given.city.is_empty() || given.state.is_empty() {
                writeln!(self.output, "City and State required.")?;
            }
        }

        if !asked.salary {
            given.salary = self.ask("Enter desired salary (optional, ex: 75000):")?;
        }
        if !asked.radius {
            given.radius = self.ask_until(
                "Enter radius in miles (optional, default = 10, ex: 25):",
                |a| parse_count::<u32>(a).map_err(|e| e.to_string()),
            )?;
        }
        if !asked.job_type {
            given.job_type = self.ask_parsed::<JobType>(
                "Enter job type (optional, options: full time, internship, part time):",
            )?;
        }
        if !asked.experience {
            given.experience = self.ask_parsed::<Experience>(
                "Enter experience level (optional, options: entry level, mid level, senior level):",
            )?;
        }
        if !asked.keywords {
            given.keywords =
                self.ask("Enter keywords to search description for, separated by a comma:")?;
        }
        if !asked.min_matches {
            given.min_matches = self.ask_until(
                "Enter minimum amount of keywords you would like matched (default is half the number of keywords):",
                |a| parse_count::<usize>(a).map_err(|e| e.to_string()),
            )?;
        }

        Ok(given)
    }
}

/// Which optional fields were supplied up front and need no prompt.
#[derive(Debug, Clone, Default)]
pub struct Asked {
    pub salary: bool,
    pub radius: bool,
    pub job_type: bool,
    pub experience: bool,
    pub keywords: bool,
    pub min_matches: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn complete(answers: &str, given: CriteriaInput, asked: Asked) -> (CriteriaInput, String) {
        let mut output = Vec::new();
        let input = {
            let mut prompter = Prompter::new(Cursor::new(answers.as_bytes()), &mut output);
            prompter.complete(given, &asked).unwrap()
        };
        (input, String::from_utf8(output).unwrap())
    }

    #[test]
    fn asks_for_everything_in_order() {
        let answers = "software engineer\nDenver\nCO\n75000\n\nfull time\nentry level\nrust, sql\n1\n";
        let (input, _) = complete(answers, CriteriaInput::default(), Asked::default());

        assert_eq!(input.title, "software engineer");
        assert_eq!(input.city, "Denver");
        assert_eq!(input.state, "CO");
        assert_eq!(input.salary, "75000");
        assert_eq!(input.radius, None);
        assert_eq!(input.job_type, JobType::FullTime);
        assert_eq!(input.experience, Experience::Entry);
        assert_eq!(input.keywords, "rust, sql");
        assert_eq!(input.min_matches, Some(1));
    }

    #[test]
    fn re_asks_until_answers_validate() {
        let answers = "\nengineer\nDenver\n\nDenver\nCO\n\nten\n25\ncontract\n\n\nrust\n\n";
        let (input, output) = complete(answers, CriteriaInput::default(), Asked::default());

        assert_eq!(input.title, "engineer");
        assert_eq!(input.state, "CO");
        assert_eq!(input.radius, Some(25));
        assert_eq!(input.job_type, JobType::Unspecified);
        assert_eq!(input.min_matches, None);
        assert!(output.contains("Job title required."));
        assert!(output.contains("City and State required."));
        assert!(output.contains("'ten' is not a valid number"));
        assert!(output.contains("unknown job type 'contract'"));
    }

    #[test]
    fn skips_fields_already_given() {
        let given = CriteriaInput {
            title: "engineer".into(),
            city: "Denver".into(),
            state: "CO".into(),
            keywords: "rust".into(),
            ..Default::default()
        };
        let asked = Asked {
            salary: true,
            radius: true,
            job_type: true,
            experience: true,
            keywords: true,
            min_matches: false,
        };
        let (input, output) = complete("2\n", given, asked);

        assert_eq!(input.min_matches, Some(2));
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn out_of_range_radius_is_asked_again() {
        let given = CriteriaInput {
            title: "engineer".into(),
            city: "Denver".into(),
            state: "CO".into(),
            keywords: "rust".into(),
            ..Default::default()
        };
        let asked = Asked {
            salary: true,
            radius: false,
            job_type: true,
            experience: true,
            keywords: true,
            min_matches: true,
        };
        let (input, output) = complete("4294967306\n25\n", given, asked);

        assert_eq!(input.radius, Some(25));
        assert!(output.contains("'4294967306' is not a valid number"));
    }

    #[test]
    fn closed_input_is_an_error() {
        let mut output = Vec::new();
        let mut prompter = Prompter::new(Cursor::new(&b""[..]), &mut output);
        assert!(prompter
            .complete(CriteriaInput::default(), &Asked::default())
            .is_err());
    }
}
