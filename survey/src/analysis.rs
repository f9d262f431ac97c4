//! Answer distributions and response subsets for choice questions.

use crate::schema::{QuestionType, Response, SchemaEntry, SurveyData};
use crate::{Error, Result};

/// Count of responses that picked one option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionCount {
    pub option: String,
    pub count: usize,
}

/// How responses are spread over a choice question's options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub key: String,
    pub text: String,
    pub qtype: QuestionType,
    /// One row per used option, in option order.
    pub rows: Vec<OptionCount>,
    /// Responses with no answer to the question.
    pub missing: usize,
    /// Sum of all option counts plus `missing`.
    ///
    /// For multiple choice questions a response is counted once per choice,
    /// so this can exceed the number of responses.
    pub total: usize,
}

impl Distribution {
    /// Percentage of `total` that `count` represents (0 when empty).
    pub fn share(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total as f64
        }
    }
}

/// Look up a choice question, rejecting unknown keys and text questions.
fn choice_question<'a>(data: &'a SurveyData, key: &str) -> Result<&'a SchemaEntry> {
    let entry = data
        .schema
        .get(key)
        .ok_or_else(|| Error::NotFound(format!("question {:?}", key)))?;
    if !entry.qtype.is_choice() {
        return Err(Error::Usage(format!(
            "{} is a text question; only SC and MC questions have options",
            key
        )));
    }
    Ok(entry)
}

/// Count answers per option for a single or multiple choice question.
pub fn distribution(data: &SurveyData, key: &str) -> Result<Distribution> {
    let entry = choice_question(data, key)?;

    let mut rows: Vec<OptionCount> = entry
        .options
        .iter()
        .map(|option| OptionCount {
            option: option.clone(),
            count: 0,
        })
        .collect();
    let mut missing = 0;

    for response in &data.responses {
        let Some(choices) = SurveyData::value(response, key).as_choices() else {
            missing += 1;
            continue;
        };
        for choice in choices {
            // Options are sorted, so binary search by name
            if let Ok(i) = rows.binary_search_by(|row| row.option.as_str().cmp(choice.as_str())) {
                rows[i].count += 1;
            }
        }
    }

    let total = rows.iter().map(|row| row.count).sum::<usize>() + missing;
    Ok(Distribution {
        key: entry.key.clone(),
        text: entry.text.clone(),
        qtype: entry.qtype,
        rows,
        missing,
        total,
    })
}

/// Responses whose answer to `key` includes `option` (case-insensitive).
pub fn subset<'a>(data: &'a SurveyData, key: &str, option: &str) -> Result<Vec<&'a Response>> {
    choice_question(data, key)?;
    let option = option.to_lowercase();

    Ok(data
        .responses
        .iter()
        .filter(|response| {
            SurveyData::value(response, key)
                .as_choices()
                .is_some_and(|choices| choices.iter().any(|c| c.to_lowercase() == option))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::build_survey;

    fn to_rows(rows: &[[&str; 3]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn survey() -> SurveyData {
        let schema = [
            ["qname", "question", "type"],
            ["RemoteWork", "Where do you work?", "SC"],
            ["Language", "Languages used?", "MC"],
            ["Comment", "Anything else?", "TE"],
        ];
        let raw = [
            ["RemoteWork", "Language", "Comment"],
            ["Remote", "Rust;Go", "hi"],
            ["In-person", "Rust", ""],
            ["Remote", "NA", "bye"],
            ["NA", "Python;Rust", ""],
        ];
        build_survey(&to_rows(&schema), &to_rows(&raw)).unwrap()
    }

    fn counts(dist: &Distribution) -> Vec<(&str, usize)> {
        dist.rows.iter().map(|r| (r.option.as_str(), r.count)).collect()
    }

    #[test]
    fn test_single_choice_distribution() {
        let dist = distribution(&survey(), "RemoteWork").unwrap();
        assert_eq!(dist.text, "Where do you work?");
        assert_eq!(counts(&dist), [("In-person", 1), ("Remote", 2)]);
        assert_eq!(dist.missing, 1);
        assert_eq!(dist.total, 4);
        assert!((dist.share(2) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_multiple_choice_counts_each_choice() {
        let dist = distribution(&survey(), "Language").unwrap();
        assert_eq!(counts(&dist), [("Go", 1), ("Python", 1), ("Rust", 3)]);
        assert_eq!(dist.missing, 1);
        assert_eq!(dist.total, 6);
    }

    #[test]
    fn test_unset_values_count_as_missing() {
        let mut data = survey();
        data.responses.push(Response::new());
        let dist = distribution(&data, "RemoteWork").unwrap();
        assert_eq!(dist.missing, 2);
    }

    #[test]
    fn test_distribution_rejects_text_and_unknown() {
        let data = survey();
        assert!(matches!(distribution(&data, "Comment"), Err(Error::Usage(_))));
        assert!(matches!(distribution(&data, "Nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_empty_distribution_share() {
        let dist = distribution(&SurveyData::default(), "x");
        assert!(dist.is_err());

        let mut data = survey();
        data.responses.clear();
        let dist = distribution(&data, "RemoteWork").unwrap();
        assert_eq!(dist.total, 0);
        assert_eq!(dist.share(0), 0.0);
    }

    #[test]
    fn test_subset_single_choice_case_insensitive() {
        let data = survey();
        let matches = subset(&data, "RemoteWork", "remote").unwrap();
        assert_eq!(matches.len(), 2);
        // Original order is kept
        assert_eq!(SurveyData::value(matches[0], "Comment").as_text().as_deref(), Some("hi"));
        assert_eq!(SurveyData::value(matches[1], "Comment").as_text().as_deref(), Some("bye"));
    }

    #[test]
    fn test_subset_multiple_choice_any_choice() {
        let data = survey();
        assert_eq!(subset(&data, "Language", "RUST").unwrap().len(), 3);
        assert_eq!(subset(&data, "Language", "go").unwrap().len(), 1);
        // Exact match only
        assert!(subset(&data, "Language", "Rus").unwrap().is_empty());
    }

    #[test]
    fn test_subset_rejects_text_and_unknown() {
        let data = survey();
        assert!(matches!(subset(&data, "Comment", "hi"), Err(Error::Usage(_))));
        assert!(matches!(subset(&data, "Nope", "x"), Err(Error::NotFound(_))));
    }
}
